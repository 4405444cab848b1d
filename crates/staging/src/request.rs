//! Staging requests and the TOML request file format

use libstage_errors::{ConfigError, Error, StagingError};
use libstage_types::{BuildTarget, CpuType, SourcePath, StrippedObject};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Everything one staging run needs to know, validated at construction
///
/// A request is immutable once built. Source handles stay unresolved until
/// the run executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRequest {
    module_name: String,
    build_target: BuildTarget,
    source_directories: Vec<SourcePath>,
    cpu_filters: BTreeSet<CpuType>,
    stripped_libs: BTreeSet<StrippedObject>,
    stripped_lib_assets: BTreeSet<StrippedObject>,
}

impl StagingRequest {
    /// Start building a request for `module_name` owned by `build_target`
    #[must_use]
    pub fn builder(module_name: impl Into<String>, build_target: BuildTarget) -> StagingRequestBuilder {
        StagingRequestBuilder {
            module_name: module_name.into(),
            build_target,
            source_directories: Vec::new(),
            cpu_filters: BTreeSet::new(),
            stripped_libs: BTreeSet::new(),
            stripped_lib_assets: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    #[must_use]
    pub fn build_target(&self) -> &BuildTarget {
        &self.build_target
    }

    /// Source directories in precedence order: earlier entries win
    #[must_use]
    pub fn source_directories(&self) -> &[SourcePath] {
        &self.source_directories
    }

    /// Empty means the whole tree of every source directory is copied
    #[must_use]
    pub fn cpu_filters(&self) -> &BTreeSet<CpuType> {
        &self.cpu_filters
    }

    #[must_use]
    pub fn stripped_libs(&self) -> &BTreeSet<StrippedObject> {
        &self.stripped_libs
    }

    #[must_use]
    pub fn stripped_lib_assets(&self) -> &BTreeSet<StrippedObject> {
        &self.stripped_lib_assets
    }

    /// Union of the stripped libraries and stripped assets
    #[must_use]
    pub fn stripped_objects(&self) -> BTreeSet<&StrippedObject> {
        self.stripped_libs
            .iter()
            .chain(self.stripped_lib_assets.iter())
            .collect()
    }
}

/// Builder for [`StagingRequest`]
#[derive(Debug, Clone)]
pub struct StagingRequestBuilder {
    module_name: String,
    build_target: BuildTarget,
    source_directories: Vec<SourcePath>,
    cpu_filters: BTreeSet<CpuType>,
    stripped_libs: BTreeSet<StrippedObject>,
    stripped_lib_assets: BTreeSet<StrippedObject>,
}

impl StagingRequestBuilder {
    /// Append a source directory. Earlier directories take precedence.
    #[must_use]
    pub fn source_dir(mut self, source: impl Into<SourcePath>) -> Self {
        self.source_directories.push(source.into());
        self
    }

    #[must_use]
    pub fn source_dirs<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SourcePath>,
    {
        self.source_directories
            .extend(sources.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cpu_filter(mut self, cpu: CpuType) -> Self {
        self.cpu_filters.insert(cpu);
        self
    }

    #[must_use]
    pub fn cpu_filters(mut self, cpus: impl IntoIterator<Item = CpuType>) -> Self {
        self.cpu_filters.extend(cpus);
        self
    }

    #[must_use]
    pub fn stripped_lib(mut self, object: StrippedObject) -> Self {
        self.stripped_libs.insert(object);
        self
    }

    #[must_use]
    pub fn stripped_lib_asset(mut self, object: StrippedObject) -> Self {
        self.stripped_lib_assets.insert(object);
        self
    }

    /// Validate and freeze the request
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the module name or a stripped object name
    /// is unsafe or when there is nothing to stage, and `ConflictingDestination` when two objects of one
    /// stripped set would land on the same file.
    pub fn build(self) -> Result<StagingRequest, StagingError> {
        validate_module_name(&self.module_name)?;

        if self.source_directories.is_empty()
            && self.stripped_libs.is_empty()
            && self.stripped_lib_assets.is_empty()
        {
            return Err(StagingError::invalid_request(format!(
                "module `{}` has no source directories, stripped libs or stripped lib assets",
                self.module_name
            )));
        }

        for object in self.stripped_libs.iter().chain(&self.stripped_lib_assets) {
            validate_object_name(&object.stripped_object_name)?;
        }
        check_destinations(&self.stripped_libs)?;
        check_destinations(&self.stripped_lib_assets)?;

        Ok(StagingRequest {
            module_name: self.module_name,
            build_target: self.build_target,
            source_directories: self.source_directories,
            cpu_filters: self.cpu_filters,
            stripped_libs: self.stripped_libs,
            stripped_lib_assets: self.stripped_lib_assets,
        })
    }
}

/// Module names become part of a directory name
///
/// # Errors
///
/// Returns `InvalidRequest` for empty names, `.`/`..`, and names containing
/// anything other than ASCII alphanumerics, `_`, `-` and `.`.
pub fn validate_module_name(name: &str) -> Result<(), StagingError> {
    if name.is_empty() {
        return Err(StagingError::invalid_request("module name is empty"));
    }
    if name == "." || name == ".." {
        return Err(StagingError::invalid_request(format!(
            "module name `{name}` is not a valid directory name"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(StagingError::invalid_request(format!(
            "module name `{name}` contains unsupported character {bad:?}"
        )));
    }
    Ok(())
}

/// Stripped object names become a single file below an ABI directory
///
/// # Errors
///
/// Returns `InvalidRequest` for empty names, `.`/`..`, and names containing a
/// path separator.
pub fn validate_object_name(name: &str) -> Result<(), StagingError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StagingError::invalid_request(format!(
            "stripped object name `{name}` is not a plain file name"
        )));
    }
    Ok(())
}

// Objects whose cpu has no ABI directory are reported later, by planning
fn check_destinations(objects: &BTreeSet<StrippedObject>) -> Result<(), StagingError> {
    let mut claimed: BTreeMap<PathBuf, &StrippedObject> = BTreeMap::new();
    for object in objects {
        let Some(destination) = object.relative_destination() else {
            continue;
        };
        if let Some(first) = claimed.get(&destination) {
            return Err(StagingError::ConflictingDestination {
                destination: destination.display().to_string(),
                first: first.to_string(),
                second: object.to_string(),
            });
        }
        claimed.insert(destination, object);
    }
    Ok(())
}

/// On-disk description of one staging request
///
/// ```toml
/// module = "native"
/// target = "//apps/sample:native"
/// source_dirs = ["third-party/prebuilt", "apps/sample/jniLibs"]
/// cpu_filters = ["arm64", "x86"]
///
/// [[stripped_libs]]
/// path = "buck-out/gen/libfoo-stripped.so"
/// name = "libfoo.so"
/// cpu = "arm64"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestFile {
    pub module: String,
    pub target: String,
    #[serde(default)]
    pub source_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub cpu_filters: Vec<CpuType>,
    #[serde(default)]
    pub stripped_libs: Vec<StrippedObjectEntry>,
    #[serde(default)]
    pub stripped_lib_assets: Vec<StrippedObjectEntry>,
}

/// One `[[stripped_libs]]` or `[[stripped_lib_assets]]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrippedObjectEntry {
    pub path: PathBuf,
    pub name: String,
    pub cpu: CpuType,
    #[serde(default)]
    pub module: String,
}

impl From<StrippedObjectEntry> for StrippedObject {
    fn from(entry: StrippedObjectEntry) -> Self {
        StrippedObject::new(entry.path, entry.name, entry.cpu, entry.module)
    }
}

impl RequestFile {
    /// Parse a request file from TOML text
    ///
    /// # Errors
    ///
    /// Returns a parse error if the text is not a valid request file.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load a request file from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, Error> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;
        Self::from_toml(&contents)
    }

    /// Validate into a [`StagingRequest`]
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`StagingRequestBuilder::build`], plus
    /// `InvalidRequest` for a malformed build target.
    pub fn into_request(self) -> Result<StagingRequest, StagingError> {
        let target = BuildTarget::parse(&self.target)?;
        let mut builder = StagingRequest::builder(self.module, target)
            .source_dirs(self.source_dirs)
            .cpu_filters(self.cpu_filters);
        for entry in self.stripped_libs {
            builder = builder.stripped_lib(entry.into());
        }
        for entry in self.stripped_lib_assets {
            builder = builder.stripped_lib_asset(entry.into());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> BuildTarget {
        BuildTarget::parse("//apps/sample:native").unwrap()
    }

    #[test]
    fn test_empty_request_is_invalid() {
        let err = StagingRequest::builder("native", target()).build().unwrap_err();
        assert!(matches!(err, StagingError::InvalidRequest { .. }));
    }

    #[test]
    fn test_cpu_filters_alone_are_not_enough() {
        let err = StagingRequest::builder("native", target())
            .cpu_filter(CpuType::Arm64)
            .build()
            .unwrap_err();
        assert!(matches!(err, StagingError::InvalidRequest { .. }));
    }

    #[test]
    fn test_module_name_rules() {
        for good in ["native", "dex_1", "my-module", "v1.2"] {
            assert!(validate_module_name(good).is_ok(), "{good}");
        }
        for bad in ["", ".", "..", "a/b", "has space", "%s", "ünï"] {
            assert!(validate_module_name(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_stripped_object_names_stay_inside_abi_directory() {
        for bad in ["/etc/evil.so", "../../escaped.so", "", ".", "..", "sub/libfoo.so", "a\\b"] {
            let err = StagingRequest::builder("native", target())
                .stripped_lib(StrippedObject::new("/a/libfoo.so", bad, CpuType::X86, ""))
                .build()
                .unwrap_err();
            assert!(matches!(err, StagingError::InvalidRequest { .. }), "{bad:?}");

            let err = StagingRequest::builder("native", target())
                .stripped_lib_asset(StrippedObject::new("/a/libfoo.so", bad, CpuType::X86, ""))
                .build()
                .unwrap_err();
            assert!(matches!(err, StagingError::InvalidRequest { .. }), "{bad:?}");
        }
        for good in ["libfoo.so", "libfoo.so.1", "..libodd.so"] {
            assert!(validate_object_name(good).is_ok(), "{good}");
        }
    }

    #[test]
    fn test_conflicting_stripped_destination() {
        let err = StagingRequest::builder("native", target())
            .stripped_lib(StrippedObject::new("/a/libfoo.so", "libfoo.so", CpuType::X86, "a"))
            .stripped_lib(StrippedObject::new("/b/libfoo.so", "libfoo.so", CpuType::X86, "b"))
            .build()
            .unwrap_err();
        assert!(matches!(err, StagingError::ConflictingDestination { .. }));
    }

    #[test]
    fn test_same_name_in_libs_and_assets_is_allowed() {
        let object = StrippedObject::new("/a/libfoo.so", "libfoo.so", CpuType::X86, "a");
        let request = StagingRequest::builder("native", target())
            .stripped_lib(object.clone())
            .stripped_lib_asset(object)
            .build()
            .unwrap();
        // Identical objects collapse in the union
        assert_eq!(request.stripped_objects().len(), 1);
    }

    #[test]
    fn test_same_name_for_different_abis_is_allowed() {
        let request = StagingRequest::builder("native", target())
            .stripped_lib(StrippedObject::new("/x86/libfoo.so", "libfoo.so", CpuType::X86, ""))
            .stripped_lib(StrippedObject::new("/arm/libfoo.so", "libfoo.so", CpuType::Arm, ""))
            .build()
            .unwrap();
        assert_eq!(request.stripped_libs().len(), 2);
    }

    #[test]
    fn test_request_file_round_trip() {
        let file = RequestFile::from_toml(
            r#"
module = "native"
target = "//apps/sample:native"
source_dirs = ["prebuilt", "/opt/ndk/libs"]
cpu_filters = ["arm64", "x86"]

[[stripped_libs]]
path = "gen/libfoo.so"
name = "libfoo.so"
cpu = "arm64"

[[stripped_lib_assets]]
path = "gen/libbar.so"
name = "libbar.so"
cpu = "x86"
module = "assets"
"#,
        )
        .unwrap();

        let request = file.into_request().unwrap();
        assert_eq!(request.module_name(), "native");
        assert_eq!(request.source_directories().len(), 2);
        assert_eq!(
            request.source_directories()[0],
            SourcePath::ProjectRelative(PathBuf::from("prebuilt"))
        );
        assert!(request.cpu_filters().contains(&CpuType::Arm64));
        assert_eq!(request.stripped_objects().len(), 2);
    }

    #[test]
    fn test_request_file_bad_target() {
        let file = RequestFile {
            module: "native".to_string(),
            target: "no-colon".to_string(),
            source_dirs: vec![PathBuf::from("libs")],
            ..RequestFile::default()
        };
        assert!(matches!(
            file.into_request(),
            Err(StagingError::InvalidRequest { .. })
        ));
    }
}
