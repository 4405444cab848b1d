//! Individually stripped native objects

use crate::{CpuType, SourcePath};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single stripped shared object destined for one ABI directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StrippedObject {
    /// File to copy
    pub source_path: SourcePath,
    /// Filename inside the ABI directory; may differ from the source filename
    pub stripped_object_name: String,
    /// Architecture the object was built for
    pub cpu_type: CpuType,
    /// Module that owns the object. Informational only.
    #[serde(default)]
    pub owning_module: String,
}

impl StrippedObject {
    pub fn new(
        source_path: impl Into<SourcePath>,
        stripped_object_name: impl Into<String>,
        cpu_type: CpuType,
        owning_module: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            stripped_object_name: stripped_object_name.into(),
            cpu_type,
            owning_module: owning_module.into(),
        }
    }

    /// `<abiDir>/<strippedObjectName>`, or `None` when the cpu has no ABI directory
    #[must_use]
    pub fn relative_destination(&self) -> Option<PathBuf> {
        self.cpu_type
            .abi_directory()
            .map(|abi| Path::new(abi).join(&self.stripped_object_name))
    }

    /// Destination of this object below `root`
    #[must_use]
    pub fn destination(&self, root: &Path) -> Option<PathBuf> {
        self.relative_destination().map(|rel| root.join(rel))
    }
}

impl fmt::Display for StrippedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} as {})",
            self.source_path, self.cpu_type, self.stripped_object_name
        )
    }
}
