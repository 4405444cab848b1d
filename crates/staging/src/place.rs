//! Placement of individually stripped objects

use libstage_errors::StagingError;
use libstage_platform::{FilesystemOperations, PlatformContext};
use libstage_types::{SourcePathResolver, StrippedObject};
use std::path::Path;

use crate::plan::StagingStep;

/// One copy step per object, into `<destination_root>/<abi>/<name>`
///
/// # Errors
///
/// Returns `UnsupportedArchitecture` for an object whose cpu has no ABI
/// directory.
pub fn place_steps<'a>(
    objects: impl IntoIterator<Item = &'a StrippedObject>,
    resolver: &dyn SourcePathResolver,
    destination_root: &Path,
) -> Result<Vec<StagingStep>, StagingError> {
    objects
        .into_iter()
        .map(|object| {
            let destination = object.destination(destination_root).ok_or_else(|| {
                StagingError::UnsupportedArchitecture {
                    cpu_type: object.cpu_type.to_string(),
                }
            })?;
            Ok(StagingStep::CopyStrippedObject {
                source: resolver.absolute_path(&object.source_path),
                destination,
            })
        })
        .collect()
}

/// Copy a single object, creating its ABI directory on demand
///
/// # Errors
///
/// Returns `FilesystemFailure` if the directory cannot be created or the copy
/// fails.
pub async fn copy_stripped_object(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    source: &Path,
    destination: &Path,
) -> Result<(), StagingError> {
    if let Some(parent) = destination.parent() {
        fs.create_dir_all(ctx, parent).await?;
    }
    fs.copy_file(ctx, source, destination).await?;
    Ok(())
}

/// Place every object below `destination_root`
///
/// # Errors
///
/// Returns `UnsupportedArchitecture` before copying anything if an object has
/// no ABI directory, or `FilesystemFailure` if a copy fails.
pub async fn place<'a>(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    objects: impl IntoIterator<Item = &'a StrippedObject>,
    resolver: &dyn SourcePathResolver,
    destination_root: &Path,
) -> Result<(), StagingError> {
    for step in place_steps(objects, resolver, destination_root)? {
        if let StagingStep::CopyStrippedObject {
            source,
            destination,
        } = &step
        {
            copy_stripped_object(fs, ctx, source, destination).await?;
        }
    }
    Ok(())
}
