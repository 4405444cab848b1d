//! Ordered overlay of native library directories

use libstage_errors::StagingError;
use libstage_platform::{FilesystemOperations, PlatformContext};
use libstage_types::CpuType;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::plan::{StagingStep, StepOutcome};

/// ABI directories for `cpu_filters`, in filter order
///
/// # Errors
///
/// Returns `UnsupportedArchitecture` for the first filter with no ABI
/// directory.
pub fn abi_directories(cpu_filters: &BTreeSet<CpuType>) -> Result<Vec<&'static str>, StagingError> {
    cpu_filters
        .iter()
        .map(|cpu| {
            cpu.abi_directory()
                .ok_or_else(|| StagingError::UnsupportedArchitecture {
                    cpu_type: cpu.to_string(),
                })
        })
        .collect()
}

/// Copy steps overlaying `sources` onto `destination`
///
/// Sources are processed last to first, so when two sources contain the same
/// relative path the one listed first ends up in `destination`. With no
/// filters each source is copied whole; otherwise only the ABI directory of
/// each filter is copied.
///
/// # Errors
///
/// Returns `UnsupportedArchitecture` if a filter has no ABI directory.
pub fn merge_steps(
    sources: &[PathBuf],
    cpu_filters: &BTreeSet<CpuType>,
    destination: &Path,
) -> Result<Vec<StagingStep>, StagingError> {
    let abis = abi_directories(cpu_filters)?;
    let mut steps = Vec::new();

    for source in sources.iter().rev() {
        if abis.is_empty() {
            steps.push(StagingStep::CopyNativeLibraries {
                source: source.clone(),
                destination: destination.to_path_buf(),
                abi: None,
            });
            continue;
        }
        for &abi in &abis {
            steps.push(StagingStep::CopyNativeLibraries {
                source: source.join(abi),
                destination: destination.join(abi),
                abi: Some(abi),
            });
        }
    }

    Ok(steps)
}

/// Execute one overlay copy
///
/// A missing `source` is skipped when `filtered` is set: a library directory
/// simply may not ship every ABI.
///
/// # Errors
///
/// Returns `FilesystemFailure` if the copy fails, or if an unfiltered source
/// directory does not exist.
pub async fn copy_native_libraries(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    source: &Path,
    destination: &Path,
    filtered: bool,
) -> Result<StepOutcome, StagingError> {
    if !fs.is_dir(ctx, source).await {
        if filtered {
            tracing::debug!(source = %source.display(), "abi directory missing, skipping");
            return Ok(StepOutcome::Skipped {
                reason: format!("{} does not exist", source.display()),
            });
        }
        return Err(StagingError::filesystem(
            "copy_native_libraries",
            source,
            "source directory does not exist",
        ));
    }

    fs.copy_directory_contents(ctx, source, destination).await?;
    Ok(StepOutcome::Completed)
}

/// Overlay `sources` onto `destination` in one call
///
/// # Errors
///
/// Returns `UnsupportedArchitecture` before copying anything if a filter has
/// no ABI directory, or `FilesystemFailure` if a copy fails.
pub async fn merge(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    sources: &[PathBuf],
    cpu_filters: &BTreeSet<CpuType>,
    destination: &Path,
) -> Result<(), StagingError> {
    for step in merge_steps(sources, cpu_filters, destination)? {
        if let StagingStep::CopyNativeLibraries {
            source,
            destination,
            abi,
        } = &step
        {
            copy_native_libraries(fs, ctx, source, destination, abi.is_some()).await?;
        }
    }
    Ok(())
}
