//! In-memory filesystem for exercising the staging engine without real I/O
//!
//! Semantics follow the host filesystem closely enough for staging: files
//! need an existing parent directory, copies overwrite files, and a file can
//! never be replaced by a directory (or the other way round).

use async_trait::async_trait;
use libstage_errors::PlatformError;
use libstage_hash::Hash;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::PlatformContext;
use crate::filesystem::FilesystemOperations;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    failing: BTreeSet<String>,
}

/// Shared in-memory tree. Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    state: Arc<Mutex<State>>,
}

fn failure(operation: &str, path: &Path, message: &str) -> PlatformError {
    PlatformError::FilesystemOperationFailed {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

impl State {
    fn check(&self, operation: &str, path: &Path) -> Result<(), PlatformError> {
        if self.failing.contains(operation) {
            return Err(failure(operation, path, "injected failure"));
        }
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        // The filesystem root always exists
        path.parent().is_none() || matches!(self.nodes.get(path), Some(Node::Dir))
    }

    fn parent_is_dir(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => true,
            Some(parent) => self.is_dir(parent),
            None => false,
        }
    }

    fn mkdirs(&mut self, operation: &str, path: &Path) -> Result<(), PlatformError> {
        for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            if ancestor.as_os_str().is_empty() || ancestor.parent().is_none() {
                continue;
            }
            match self.nodes.get(ancestor) {
                Some(Node::Dir) => {}
                Some(Node::File(_)) => {
                    return Err(failure(operation, ancestor, "not a directory"));
                }
                None => {
                    self.nodes.insert(ancestor.to_path_buf(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn descendants(&self, root: &Path) -> Vec<(PathBuf, Node)> {
        self.nodes
            .range(root.to_path_buf()..)
            .take_while(|(path, _)| path.starts_with(root))
            .filter(|(path, _)| path.as_path() != root)
            .map(|(path, node)| (path.clone(), node.clone()))
            .collect()
    }

    fn put_file(
        &mut self,
        operation: &str,
        path: &Path,
        contents: Vec<u8>,
    ) -> Result<(), PlatformError> {
        if !self.parent_is_dir(path) {
            return Err(failure(operation, path, "parent directory does not exist"));
        }
        if matches!(self.nodes.get(path), Some(Node::Dir)) {
            return Err(failure(operation, path, "is a directory"));
        }
        self.nodes.insert(path.to_path_buf(), Node::File(contents));
        Ok(())
    }

    fn file(&self, operation: &str, path: &Path) -> Result<Vec<u8>, PlatformError> {
        match self.nodes.get(path) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            Some(Node::Dir) => Err(failure(operation, path, "is a directory")),
            None => Err(failure(operation, path, "no such file")),
        }
    }
}

impl MemoryFilesystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every mutation completes before unlocking, so a poisoned tree is still valid
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seed a file, creating its parent directories
    ///
    /// # Errors
    ///
    /// Returns `FilesystemOperationFailed` if an ancestor of `path` is a file.
    pub fn insert_file(
        &self,
        path: impl AsRef<Path>,
        contents: impl Into<Vec<u8>>,
    ) -> Result<(), PlatformError> {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            state.mkdirs("insert_file", parent)?;
        }
        state
            .nodes
            .insert(path.to_path_buf(), Node::File(contents.into()));
        Ok(())
    }

    /// Seed an empty directory
    ///
    /// # Errors
    ///
    /// Returns `FilesystemOperationFailed` if `path` or one of its ancestors
    /// is a file.
    pub fn insert_dir(&self, path: impl AsRef<Path>) -> Result<(), PlatformError> {
        self.lock().mkdirs("insert_dir", path.as_ref())
    }

    /// Contents of a file, if it exists
    #[must_use]
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().nodes.get(path.as_ref()) {
            Some(Node::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    /// Every file in the tree, sorted
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .nodes
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Make every call of `operation` fail from now on
    pub fn fail_operation(&self, operation: impl Into<String>) {
        self.lock().failing.insert(operation.into());
    }
}

#[async_trait]
impl FilesystemOperations for MemoryFilesystem {
    async fn create_dir_all(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("create_dir_all", None, path, async {
            let mut state = self.lock();
            state.check("create_dir_all", path)?;
            state.mkdirs("create_dir_all", path)
        })
        .await
    }

    async fn remove_dir_all(
        &self,
        ctx: &PlatformContext,
        path: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("remove_dir_all", None, path, async {
            let mut state = self.lock();
            state.check("remove_dir_all", path)?;
            let doomed = state.descendants(path);
            for (descendant, _) in doomed {
                state.nodes.remove(&descendant);
            }
            state.nodes.remove(path);
            Ok(())
        })
        .await
    }

    async fn exists(&self, _ctx: &PlatformContext, path: &Path) -> bool {
        let state = self.lock();
        path.parent().is_none() || state.nodes.contains_key(path)
    }

    async fn is_dir(&self, _ctx: &PlatformContext, path: &Path) -> bool {
        self.lock().is_dir(path)
    }

    async fn copy_file(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("copy_file", Some(src), dst, async {
            let mut state = self.lock();
            state.check("copy_file", src)?;
            let contents = state.file("copy_file", src)?;
            state.put_file("copy_file", dst, contents)
        })
        .await
    }

    async fn copy_directory_contents(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("copy_directory_contents", Some(src), dst, async {
            let mut state = self.lock();
            state.check("copy_directory_contents", src)?;
            if !state.is_dir(src) {
                return Err(failure("copy_directory_contents", src, "not a directory"));
            }
            state.mkdirs("copy_directory_contents", dst)?;
            // Ancestors sort before descendants, so parents are created first
            let entries = state.descendants(src);
            for (path, node) in entries {
                let Ok(relative) = path.strip_prefix(src) else {
                    continue;
                };
                let target = dst.join(relative);
                match node {
                    Node::Dir => state.mkdirs("copy_directory_contents", &target)?,
                    Node::File(contents) => {
                        state.put_file("copy_directory_contents", &target, contents)?;
                    }
                }
            }
            Ok(())
        })
        .await
    }

    async fn atomic_rename(
        &self,
        ctx: &PlatformContext,
        src: &Path,
        dst: &Path,
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("atomic_rename", Some(src), dst, async {
            let mut state = self.lock();
            state.check("atomic_rename", src)?;
            let Some(node) = state.nodes.get(src).cloned() else {
                return Err(failure("atomic_rename", src, "no such file"));
            };
            if !state.parent_is_dir(dst) {
                return Err(failure(
                    "atomic_rename",
                    dst,
                    "parent directory does not exist",
                ));
            }
            let moved = state.descendants(src);
            for (path, _) in &moved {
                state.nodes.remove(path);
            }
            state.nodes.remove(src);
            state.nodes.insert(dst.to_path_buf(), node);
            for (path, node) in moved {
                if let Ok(relative) = path.strip_prefix(src) {
                    state.nodes.insert(dst.join(relative), node);
                }
            }
            Ok(())
        })
        .await
    }

    async fn list_files(
        &self,
        _ctx: &PlatformContext,
        root: &Path,
    ) -> Result<Vec<PathBuf>, PlatformError> {
        let state = self.lock();
        state.check("list_files", root)?;
        let mut files: Vec<PathBuf> = state
            .descendants(root)
            .into_iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path)
            .collect();
        files.sort();
        Ok(files)
    }

    async fn hash_file(&self, _ctx: &PlatformContext, path: &Path) -> Result<Hash, PlatformError> {
        let state = self.lock();
        state.check("hash_file", path)?;
        let contents = state.file("hash_file", path)?;
        Ok(Hash::from_data(&contents))
    }

    async fn write_file(
        &self,
        ctx: &PlatformContext,
        path: &Path,
        contents: &[u8],
    ) -> Result<(), PlatformError> {
        ctx.execute_with_events("write_file", None, path, async {
            let mut state = self.lock();
            state.check("write_file", path)?;
            state.put_file("write_file", path, contents.to_vec())
        })
        .await
    }

    async fn read_to_string(
        &self,
        _ctx: &PlatformContext,
        path: &Path,
    ) -> Result<String, PlatformError> {
        let state = self.lock();
        state.check("read_to_string", path)?;
        let contents = state.file("read_to_string", path)?;
        String::from_utf8(contents).map_err(|e| failure("read_to_string", path, &e.to_string()))
    }
}
