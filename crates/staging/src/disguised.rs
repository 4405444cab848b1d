//! Renaming of executables disguised as native libraries
//!
//! Android only extracts `lib*.so` files from an APK's native library
//! directories, so executables are shipped as `<name>-disguised-exe` and
//! renamed to `lib<name>.so` at staging time.

use libstage_errors::StagingError;
use libstage_platform::{FilesystemOperations, PlatformContext};
use std::path::{Path, PathBuf};

/// Suffix marking a disguised executable
pub const DISGUISED_EXE_SUFFIX: &str = "-disguised-exe";

/// New location for `path` if it is a disguised executable
///
/// `dir/foo-disguised-exe` becomes `dir/libfoo.so`. Files whose name is only
/// the suffix are left alone.
#[must_use]
pub fn renamed_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(DISGUISED_EXE_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(path.with_file_name(format!("lib{stem}.so")))
}

/// Rename every disguised executable below `root`, returning how many were
/// renamed
///
/// Running it again on the same tree renames nothing.
///
/// # Errors
///
/// Returns `FilesystemFailure` if listing or renaming fails, if a file name
/// is not valid UTF-8, or if the renamed file already exists.
pub async fn resolve(
    fs: &dyn FilesystemOperations,
    ctx: &PlatformContext,
    root: &Path,
) -> Result<usize, StagingError> {
    let mut renamed = 0;
    for path in fs.list_files(ctx, root).await? {
        if path.file_name().and_then(|name| name.to_str()).is_none() {
            return Err(StagingError::filesystem(
                "rename_native_executables",
                &path,
                "file name is not valid UTF-8",
            ));
        }
        let Some(target) = renamed_path(&path) else {
            continue;
        };
        if fs.exists(ctx, &target).await {
            return Err(StagingError::filesystem(
                "rename_native_executables",
                &target,
                format!("{} would replace an existing file", path.display()),
            ));
        }
        tracing::debug!(from = %path.display(), to = %target.display(), "renaming disguised executable");
        fs.atomic_rename(ctx, &path, &target).await?;
        renamed += 1;
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libstage_platform::MemoryFilesystem;

    #[test]
    fn test_renamed_path() {
        assert_eq!(
            renamed_path(Path::new("libs/x86/gdbserver-disguised-exe")),
            Some(PathBuf::from("libs/x86/libgdbserver.so"))
        );
        assert_eq!(renamed_path(Path::new("libs/x86/libfoo.so")), None);
        assert_eq!(renamed_path(Path::new("libs/x86/-disguised-exe")), None);
        assert_eq!(
            renamed_path(Path::new("libs/x86/foo-disguised-exe.bak")),
            None
        );
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let fs = MemoryFilesystem::new();
        let ctx = PlatformContext::default();
        fs.insert_file("/libs/x86/foo-disguised-exe", "exe").unwrap();
        fs.insert_file("/libs/x86/libbar.so", "bar").unwrap();
        fs.insert_file("/libs/bin-disguised-exe/keep.so", "dir segment untouched").unwrap();

        assert_eq!(resolve(&fs, &ctx, Path::new("/libs")).await.unwrap(), 1);
        assert_eq!(fs.read("/libs/x86/libfoo.so").unwrap(), b"exe");
        assert!(fs.read("/libs/x86/foo-disguised-exe").is_none());
        assert!(fs.read("/libs/bin-disguised-exe/keep.so").is_some());

        let before = fs.files();
        assert_eq!(resolve(&fs, &ctx, Path::new("/libs")).await.unwrap(), 0);
        assert_eq!(fs.files(), before);
    }

    #[tokio::test]
    async fn test_resolve_empty_tree() {
        let fs = MemoryFilesystem::new();
        let ctx = PlatformContext::default();
        assert_eq!(resolve(&fs, &ctx, Path::new("/libs")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resolve_refuses_to_replace_existing_library() {
        let fs = MemoryFilesystem::new();
        let ctx = PlatformContext::default();
        fs.insert_file("/libs/x86/libfoo.so", "real library").unwrap();
        fs.insert_file("/libs/x86/foo-disguised-exe", "exe").unwrap();

        let err = resolve(&fs, &ctx, Path::new("/libs")).await.unwrap_err();
        assert!(matches!(
            err,
            StagingError::FilesystemFailure { ref path, .. } if path == "/libs/x86/libfoo.so"
        ));
        assert_eq!(fs.read("/libs/x86/libfoo.so").unwrap(), b"real library");
        assert_eq!(fs.read("/libs/x86/foo-disguised-exe").unwrap(), b"exe");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_rejects_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let fs = MemoryFilesystem::new();
        let ctx = PlatformContext::default();
        let odd = Path::new("/libs/x86").join(OsStr::from_bytes(b"lib\xffoo-disguised-exe"));
        fs.insert_file(&odd, "exe").unwrap();

        let err = resolve(&fs, &ctx, Path::new("/libs")).await.unwrap_err();
        assert!(matches!(err, StagingError::FilesystemFailure { .. }));
        assert!(fs.read(&odd).is_some());
    }
}
