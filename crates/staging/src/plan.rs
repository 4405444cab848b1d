//! Step plan of a staging run
//!
//! A [`StagingPlan`] is computed from a request before anything touches the
//! filesystem. Building the plan resolves every source handle and every ABI
//! directory, so requests that cannot succeed fail here with no output.

use libstage_errors::StagingError;
use libstage_platform::{FilesystemOperations, PlatformContext};
use libstage_types::SourcePathResolver;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::layout::StagingLayout;
use crate::manifest::{self, Manifest};
use crate::request::StagingRequest;
use crate::{disguised, merge, place};

/// One unit of work in a staging run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingStep {
    /// Remove `path` if present and recreate it empty
    MakeCleanDir { path: PathBuf },

    /// Overlay the contents of `source` onto `destination`
    ///
    /// `abi` is set for ABI-filtered copies; a missing source is skipped for
    /// those.
    CopyNativeLibraries {
        source: PathBuf,
        destination: PathBuf,
        abi: Option<&'static str>,
    },

    /// Copy one stripped object to its ABI directory
    CopyStrippedObject {
        source: PathBuf,
        destination: PathBuf,
    },

    /// Rename `X-disguised-exe` files below `root` to `libX.so`
    RenameNativeExecutables { root: PathBuf },

    /// Hash every file below `root` and write the manifest
    HashNativeLibs { root: PathBuf, manifest_path: PathBuf },
}

/// What executing a step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// The step had nothing to do
    Skipped { reason: String },
    /// Files renamed by the disguised executable pass
    Renamed(usize),
    /// Manifest written by the hashing step
    Hashed(Manifest),
}

/// Handles a step needs to execute
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub fs: &'a dyn FilesystemOperations,
    pub ctx: &'a PlatformContext,
    pub hash_jobs: usize,
}

impl<'a> StepContext<'a> {
    #[must_use]
    pub fn new(fs: &'a dyn FilesystemOperations, ctx: &'a PlatformContext, hash_jobs: usize) -> Self {
        Self { fs, ctx, hash_jobs }
    }
}

fn shell(path: &Path) -> String {
    path.display().to_string()
}

impl StagingStep {
    /// Stable identifier used in events and logs
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::MakeCleanDir { .. } => "make_clean_dir",
            Self::CopyNativeLibraries { .. } => "copy_native_libraries",
            Self::CopyStrippedObject { .. } => "copy_stripped_object",
            Self::RenameNativeExecutables { .. } => "rename_native_executables",
            Self::HashNativeLibs { .. } => "hash_native_libs",
        }
    }

    /// Shell-like rendering of what the step does
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::MakeCleanDir { path } => {
                format!("rm -rf {p} && mkdir -p {p}", p = shell(path))
            }
            Self::CopyNativeLibraries {
                source,
                destination,
                abi: Some(_),
            } => format!(
                "[ -d {s} ] && mkdir -p {d} && cp -R {s}/. {d}",
                s = shell(source),
                d = shell(destination)
            ),
            Self::CopyNativeLibraries {
                source,
                destination,
                abi: None,
            } => format!(
                "mkdir -p {d} && cp -R {s}/. {d}",
                s = shell(source),
                d = shell(destination)
            ),
            Self::CopyStrippedObject {
                source,
                destination,
            } => {
                let parent = destination.parent().unwrap_or(destination);
                format!(
                    "mkdir -p {} && cp {} {}",
                    shell(parent),
                    shell(source),
                    shell(destination)
                )
            }
            Self::RenameNativeExecutables { root } => format!(
                "rename {}/**/*{} to lib*.so",
                shell(root),
                disguised::DISGUISED_EXE_SUFFIX
            ),
            Self::HashNativeLibs {
                root,
                manifest_path,
            } => format!(
                "hash files under {} > {}",
                shell(root),
                shell(manifest_path)
            ),
        }
    }

    /// Run the step
    ///
    /// # Errors
    ///
    /// Returns `FilesystemFailure` when an underlying operation fails.
    pub async fn execute(&self, step: StepContext<'_>) -> Result<StepOutcome, StagingError> {
        let StepContext { fs, ctx, hash_jobs } = step;
        match self {
            Self::MakeCleanDir { path } => {
                fs.remove_dir_all(ctx, path).await?;
                fs.create_dir_all(ctx, path).await?;
                Ok(StepOutcome::Completed)
            }
            Self::CopyNativeLibraries {
                source,
                destination,
                abi,
            } => merge::copy_native_libraries(fs, ctx, source, destination, abi.is_some()).await,
            Self::CopyStrippedObject {
                source,
                destination,
            } => {
                place::copy_stripped_object(fs, ctx, source, destination).await?;
                Ok(StepOutcome::Completed)
            }
            Self::RenameNativeExecutables { root } => {
                let renamed = disguised::resolve(fs, ctx, root).await?;
                Ok(StepOutcome::Renamed(renamed))
            }
            Self::HashNativeLibs {
                root,
                manifest_path,
            } => {
                let manifest = manifest::generate(fs, ctx, root, manifest_path, hash_jobs).await?;
                Ok(StepOutcome::Hashed(manifest))
            }
        }
    }
}

impl fmt::Display for StagingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.short_name(), self.description())
    }
}

/// Ordered steps of one staging run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingPlan {
    steps: Vec<StagingStep>,
}

impl StagingPlan {
    /// Plan the run for `request` into `layout`
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchitecture` when a cpu filter or a stripped
    /// object has no ABI directory.
    pub fn build(
        request: &StagingRequest,
        layout: &StagingLayout,
        resolver: &dyn SourcePathResolver,
    ) -> Result<Self, StagingError> {
        let mut steps = vec![
            StagingStep::MakeCleanDir {
                path: layout.all_libs_root().to_path_buf(),
            },
            StagingStep::MakeCleanDir {
                path: layout.libs_root().to_path_buf(),
            },
            StagingStep::MakeCleanDir {
                path: layout.libs_assets_root().to_path_buf(),
            },
        ];

        let sources: Vec<PathBuf> = request
            .source_directories()
            .iter()
            .map(|source| resolver.absolute_path(source))
            .collect();
        steps.extend(merge::merge_steps(
            &sources,
            request.cpu_filters(),
            layout.libs_root(),
        )?);
        steps.extend(place::place_steps(
            request.stripped_libs(),
            resolver,
            layout.libs_root(),
        )?);
        steps.extend(place::place_steps(
            request.stripped_lib_assets(),
            resolver,
            layout.libs_assets_root(),
        )?);

        steps.push(StagingStep::RenameNativeExecutables {
            root: layout.libs_root().to_path_buf(),
        });
        steps.push(StagingStep::HashNativeLibs {
            root: layout.all_libs_root().to_path_buf(),
            manifest_path: layout.manifest_path().to_path_buf(),
        });

        Ok(Self { steps })
    }

    #[must_use]
    pub fn steps(&self) -> &[StagingStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagingStep> {
        self.steps.iter()
    }
}

impl fmt::Display for StagingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            writeln!(f, "{:>3}. {step}", index + 1)?;
        }
        Ok(())
    }
}
