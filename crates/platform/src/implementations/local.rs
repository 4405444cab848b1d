//! Real filesystem implementation on top of `tokio::fs`

use async_trait::async_trait;
use libstage_errors::PlatformError;
use libstage_hash::Hash;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::PlatformContext;
use crate::filesystem::FilesystemOperations;

/// Filesystem operations against the host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

async fn copy_tree(src: &Path, dst: &Path) -> Result<(), PlatformError> {
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];

    while let Some((from, to)) = pending.pop() {
        fs::create_dir_all(&to)
            .await
            .map_err(|e| PlatformError::from_io("create_dir_all", &to, &e))?;

        let mut entries = fs::read_dir(&from)
            .await
            .map_err(|e| PlatformError::from_io("read_dir", &from, &e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PlatformError::from_io("read_dir", &from, &e))?
        {
            let src_path = entry.path();
            let dst_path = to.join(entry.file_name());

            // Follow symlinks so linked libraries are copied as regular files
            let metadata = fs::metadata(&src_path)
                .await
                .map_err(|e| PlatformError::from_io("metadata", &src_path, &e))?;
            if metadata.is_dir() {
                pending.push((src_path, dst_path));
            } else {
                fs::copy(&src_path, &dst_path)
                    .await
                    .map_err(|e| PlatformError::from_io("copy_file", &dst_path, &e))?;
            }
        }
    }

    Ok(())
}

async fn collect_files(root: &Path) -> Result<Vec<PathBuf>, PlatformError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| PlatformError::from_io("read_dir", &dir, &e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PlatformError::from_io("read_dir", &dir, &e))?
        {
            let path = entry.path();
            let metadata = fs::metadata(&path)
                .await
                .map_err(|e| PlatformError::from_io("metadata", &path, &e))?;
            if metadata.is_dir() {
                pending.push(path);
            } else if metadata.is_file() {
                files.push(path);
            }
        }
    }

    Ok(files)
}

#[async_trait]
impl FilesystemOperations for LocalFilesystem {
    async fn create_dir_all(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("create_dir_all", None, path, async {
            fs::create_dir_all(path)
                .await
                .map_err(|e| PlatformError::from_io("create_dir_all", path, &e))
        })
        .await
    }

    async fn remove_dir_all(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("remove_dir_all", None, path, async {
            match fs::remove_dir_all(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(PlatformError::from_io("remove_dir_all", path, &e)),
            }
        })
        .await
    }

    async fn exists(&self, _ctx: &PlatformContext, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_dir(&self, _ctx: &PlatformContext, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false)
    }

    async fn copy_file(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("copy_file", Some(src), dst, async {
            fs::copy(src, dst)
                .await
                .map(|_| ())
                .map_err(|e| PlatformError::from_io("copy_file", src, &e))
        })
        .await
    }

    async fn copy_directory_contents(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("copy_directory_contents", Some(src), dst, copy_tree(src, dst))
            .await
    }

    async fn atomic_rename(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("atomic_rename", Some(src), dst, async {
            fs::rename(src, dst)
                .await
                .map_err(|e| PlatformError::from_io("atomic_rename", src, &e))
        })
        .await
    }

    async fn list_files(
        &self,
        _ctx: &PlatformContext,
        root: &Path,
    ) -> Result<Vec<PathBuf>, PlatformError> {
        if !fs::try_exists(root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let mut files = collect_files(root).await?;
        files.sort();
        Ok(files)
    }

    async fn hash_file(&self, _ctx: &PlatformContext, path: &Path) -> Result<Hash, PlatformError> {
        let file = fs::File::open(path)
            .await
            .map_err(|e| PlatformError::from_io("hash_file", path, &e))?;
        Hash::hash_reader(file)
            .await
            .map_err(|e| PlatformError::from_io("hash_file", path, &e))
    }

    async fn write_file(
        &self,
        ctx: &PlatformContext,
        path: &Path,
        contents: &[u8],
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("write_file", None, path, async {
            fs::write(path, contents)
                .await
                .map_err(|e| PlatformError::from_io("write_file", path, &e))
        })
        .await
    }

    async fn read_to_string(
        &self,
        _ctx: &PlatformContext,
        path: &Path,
    ) -> Result<String, PlatformError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| PlatformError::from_io("read_to_string", path, &e))
    }
}
