//! Scratch directory layout of one staging run

use libstage_types::BuildTarget;
use std::path::{Path, PathBuf};

/// Directory holding the merged, placed and renamed libraries
pub const LIBS_DIR: &str = "libs";
/// Directory holding stripped asset libraries
pub const ASSET_LIBS_DIR: &str = "assetLibs";
/// Manifest file name
pub const MANIFEST_FILE: &str = "metadata.txt";

/// Output locations of one run
///
/// Every path is a pure function of the scratch root, the build target and
/// the module name, so two runs for different modules or targets never share
/// a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    all_libs_root: PathBuf,
    libs_root: PathBuf,
    libs_assets_root: PathBuf,
    manifest_path: PathBuf,
}

impl StagingLayout {
    /// `<scratch_root>/<base/path>/__native_<module>_<short_name>__`
    #[must_use]
    pub fn new(scratch_root: &Path, target: &BuildTarget, module_name: &str) -> Self {
        let format = format!("__native_{module_name}_%s__");
        Self::from_run_dir(target.scratch_path(scratch_root, &format))
    }

    /// Layout rooted at an existing run directory
    #[must_use]
    pub fn from_run_dir(run_dir: impl Into<PathBuf>) -> Self {
        let all_libs_root = run_dir.into();
        Self {
            libs_root: all_libs_root.join(LIBS_DIR),
            libs_assets_root: all_libs_root.join(ASSET_LIBS_DIR),
            manifest_path: all_libs_root.join(MANIFEST_FILE),
            all_libs_root,
        }
    }

    /// Common parent of the two library roots; manifest paths are relative to it
    #[must_use]
    pub fn all_libs_root(&self) -> &Path {
        &self.all_libs_root
    }

    #[must_use]
    pub fn libs_root(&self) -> &Path {
        &self.libs_root
    }

    #[must_use]
    pub fn libs_assets_root(&self) -> &Path {
        &self.libs_assets_root
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Paths a successful run registers as build artifacts
    #[must_use]
    pub fn artifacts(&self) -> Vec<PathBuf> {
        vec![
            self.libs_root.clone(),
            self.libs_assets_root.clone(),
            self.manifest_path.clone(),
        ]
    }
}
