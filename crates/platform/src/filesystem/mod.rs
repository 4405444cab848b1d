//! Filesystem operations used by the staging engine

use async_trait::async_trait;
use libstage_errors::PlatformError;
use libstage_hash::Hash;
use std::path::{Path, PathBuf};

use crate::core::PlatformContext;

/// Capability interface over the filesystem primitives a staging run needs
#[async_trait]
pub trait FilesystemOperations: Send + Sync {
    /// Create directory and all parent directories
    async fn create_dir_all(&self, ctx: &PlatformContext, path: &Path)
        -> Result<(), PlatformError>;

    /// Remove directory and all contents. A missing directory is not an error.
    async fn remove_dir_all(&self, ctx: &PlatformContext, path: &Path)
        -> Result<(), PlatformError>;

    /// Check if a path exists
    async fn exists(&self, ctx: &PlatformContext, path: &Path) -> bool;

    /// Check if a path points to a directory.
    async fn is_dir(&self, ctx: &PlatformContext, path: &Path) -> bool;

    /// Copy one file to `dst`, replacing whatever file is there.
    /// The parent of `dst` must exist.
    async fn copy_file(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError>;

    /// Copy the contents of directory `src` into `dst`, creating `dst` if
    /// needed and overwriting colliding files.
    async fn copy_directory_contents(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError>;

    /// Atomically rename a file
    async fn atomic_rename(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError>;

    /// Every regular file below `root`, recursively, sorted by path.
    /// A missing root yields an empty list.
    async fn list_files(
        &self,
        ctx: &PlatformContext,
        root: &Path,
    ) -> Result<Vec<PathBuf>, PlatformError>;

    /// Content hash of one file
    async fn hash_file(&self, ctx: &PlatformContext, path: &Path) -> Result<Hash, PlatformError>;

    /// Write `contents` to `path`, truncating any previous content
    async fn write_file(
        &self,
        ctx: &PlatformContext,
        path: &Path,
        contents: &[u8],
    ) -> Result<(), PlatformError>;

    /// Read a whole file as UTF-8 text
    async fn read_to_string(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<String, PlatformError>;
}
