//! Opaque source path handles and their resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A reference to an input file or directory
///
/// Handles stay unresolved inside a request; they are turned into absolute
/// paths by a [`SourcePathResolver`] when a staging run executes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "PathBuf", into = "PathBuf")]
pub enum SourcePath {
    /// Already absolute
    Absolute(PathBuf),
    /// Relative to the project root
    ProjectRelative(PathBuf),
}

impl SourcePath {
    /// Classify a path by whether it is absolute
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_absolute() {
            Self::Absolute(path)
        } else {
            Self::ProjectRelative(path)
        }
    }

    /// The path as written, without resolution
    #[must_use]
    pub fn as_path(&self) -> &Path {
        match self {
            Self::Absolute(path) | Self::ProjectRelative(path) => path,
        }
    }

    /// Final path component, used when describing a handle
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.as_path().file_name().and_then(|name| name.to_str())
    }
}

impl From<PathBuf> for SourcePath {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for SourcePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<SourcePath> for PathBuf {
    fn from(source: SourcePath) -> Self {
        match source {
            SourcePath::Absolute(path) | SourcePath::ProjectRelative(path) => path,
        }
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path().display())
    }
}

/// Turns [`SourcePath`] handles into absolute paths at execution time
pub trait SourcePathResolver: Send + Sync {
    /// Absolute location of `source`
    fn absolute_path(&self, source: &SourcePath) -> PathBuf;
}

/// Resolves project-relative handles against a fixed project root
#[derive(Debug, Clone)]
pub struct ProjectRootResolver {
    root: PathBuf,
}

impl ProjectRootResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourcePathResolver for ProjectRootResolver {
    fn absolute_path(&self, source: &SourcePath) -> PathBuf {
        match source {
            SourcePath::Absolute(path) => path.clone(),
            SourcePath::ProjectRelative(path) => self.root.join(path),
        }
    }
}
