//! Content-hash manifest of a staged tree
//!
//! The manifest is a text file with one `<relative path> <hex hash>` line per
//! staged file, sorted by path and newline-terminated. Incremental installers
//! diff it against what is already on the device, so two runs over the same
//! inputs must produce identical bytes.

use futures::stream::{self, StreamExt, TryStreamExt};
use libstage_errors::{StagingError, StorageError};
use libstage_hash::Hash;
use libstage_platform::{FilesystemOperations, PlatformContext};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path};

/// One staged file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManifestEntry {
    /// `/`-separated, relative to the manifest root
    pub relative_path: String,
    pub hash: Hash,
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.relative_path, self.hash)
    }
}

/// Entries sorted by relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

/// Paths that differ between a recorded and a current manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl ManifestDiff {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl Manifest {
    /// Build a manifest from entries in any order
    #[must_use]
    pub fn new(mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash recorded for `relative_path`
    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&Hash> {
        self.entries
            .binary_search_by(|entry| entry.relative_path.as_str().cmp(relative_path))
            .ok()
            .map(|index| &self.entries[index].hash)
    }

    /// Manifest file contents
    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{entry}\n"))
            .collect()
    }

    /// Parse manifest file contents
    ///
    /// # Errors
    ///
    /// Returns `CorruptedData` for a line without a path and a hash, for a
    /// hash that is not valid hex, or for a path listed twice.
    pub fn parse(contents: &str) -> Result<Self, StorageError> {
        let mut entries = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let corrupt = |why: &str| StorageError::CorruptedData {
                message: format!("manifest line {}: {why}", number + 1),
            };
            let (path, hex) = line
                .rsplit_once(' ')
                .ok_or_else(|| corrupt("expected `<path> <hash>`"))?;
            if path.is_empty() {
                return Err(corrupt("empty path"));
            }
            let hash = Hash::from_hex(hex).map_err(|_| corrupt("invalid hash"))?;
            entries.push(ManifestEntry {
                relative_path: path.to_string(),
                hash,
            });
        }

        let manifest = Self::new(entries);
        if let Some(pair) = manifest
            .entries
            .windows(2)
            .find(|pair| pair[0].relative_path == pair[1].relative_path)
        {
            return Err(StorageError::CorruptedData {
                message: format!("manifest lists {} twice", pair[0].relative_path),
            });
        }
        Ok(manifest)
    }

    /// Compare this (recorded) manifest against `current`
    #[must_use]
    pub fn diff(&self, current: &Manifest) -> ManifestDiff {
        let recorded: BTreeMap<&str, &Hash> = self
            .entries
            .iter()
            .map(|entry| (entry.relative_path.as_str(), &entry.hash))
            .collect();
        let mut diff = ManifestDiff::default();

        for entry in &current.entries {
            match recorded.get(entry.relative_path.as_str()) {
                None => diff.added.push(entry.relative_path.clone()),
                Some(hash) if **hash != entry.hash => {
                    diff.changed.push(entry.relative_path.clone());
                }
                Some(_) => {}
            }
        }
        for entry in &self.entries {
            if current.get(&entry.relative_path).is_none() {
                diff.removed.push(entry.relative_path.clone());
            }
        }

        diff
    }
}

/// `/`-joined path of `path` below `root`
fn relative_path(root: &Path, path: &Path) -> Result<String, StagingError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| StagingError::filesystem("hash_native_libs", path, "file is outside the manifest root"))?;
    let mut segments = Vec::new();
    for component in relative.components() {
        if let Component::Normal(segment) = component {
            let segment = segment.to_str().ok_or_else(|| {
                StagingError::filesystem("hash_native_libs", path, "file name is not valid UTF-8")
            })?;
            segments.push(segment);
        }
    }
    Ok(segments.join("/"))
}

/// Hash every regular file below `root` except `exclude`
///
/// At most `hash_jobs` files are hashed concurrently.
///
/// # Errors
///
/// Returns `FilesystemFailure` if listing or hashing fails.
pub async fn compute(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    root: &Path,
    exclude: &Path,
    hash_jobs: usize,
) -> Result<Manifest, StagingError> {
    let files: Vec<_> = fs
        .list_files(ctx, root)
        .await?
        .into_iter()
        .filter(|path| path != exclude)
        .collect();

    let entries: Vec<ManifestEntry> = stream::iter(files)
        .map(|path| async move {
            let hash = fs.hash_file(ctx, &path).await?;
            Ok::<_, StagingError>(ManifestEntry {
                relative_path: relative_path(root, &path)?,
                hash,
            })
        })
        .buffered(hash_jobs.max(1))
        .try_collect()
        .await?;

    Ok(Manifest::new(entries))
}

/// Hash every file below `root` and write the manifest to `manifest_path`,
/// replacing any previous manifest
///
/// # Errors
///
/// Returns `FilesystemFailure` if hashing or writing fails.
pub async fn generate(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    root: &Path,
    manifest_path: &Path,
    hash_jobs: usize,
) -> Result<Manifest, StagingError> {
    let manifest = compute(fs, ctx, root, manifest_path, hash_jobs).await?;
    fs.write_file(ctx, manifest_path, manifest.render().as_bytes())
        .await?;
    tracing::debug!(
        entries = manifest.len(),
        path = %manifest_path.display(),
        "wrote native library manifest"
    );
    Ok(manifest)
}

/// Read and parse the manifest at `manifest_path`
///
/// # Errors
///
/// Returns `FilesystemFailure` if the file cannot be read, or `CorruptedData`
/// (as a storage error) if it cannot be parsed.
pub async fn load(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    manifest_path: &Path,
) -> Result<Manifest, libstage_errors::Error> {
    let contents = fs
        .read_to_string(ctx, manifest_path)
        .await
        .map_err(StagingError::from)?;
    Ok(Manifest::parse(&contents)?)
}
