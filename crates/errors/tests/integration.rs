//! Integration tests for error types

#[cfg(test)]
mod tests {
    use libstage_errors::*;

    #[test]
    fn test_error_conversion() {
        let staging_err = StagingError::UnsupportedArchitecture {
            cpu_type: "riscv".into(),
        };
        let err: Error = staging_err.into();
        assert!(matches!(err, Error::Staging(_)));
        assert!(err.as_staging().is_some());
    }

    #[test]
    fn test_error_display() {
        let err = StagingError::invalid_request("no native libraries to stage");
        assert_eq!(
            err.to_string(),
            "invalid staging request: no native libraries to stage"
        );
    }

    #[test]
    fn test_platform_error_becomes_filesystem_failure() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let platform_err =
            PlatformError::from_io("copy_file", std::path::Path::new("/tmp/a.so"), &io_err);
        let staging_err: StagingError = platform_err.into();
        match staging_err {
            StagingError::FilesystemFailure {
                operation, path, ..
            } => {
                assert_eq!(operation, "copy_file");
                assert_eq!(path, "/tmp/a.so");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_user_codes() {
        let err: Error = StagingError::ConflictingDestination {
            destination: "x86/libfoo.so".into(),
            first: "a/libfoo.so".into(),
            second: "b/libfoo.so".into(),
        }
        .into();
        assert_eq!(err.user_code(), Some("staging.conflicting_destination"));
        assert!(err.user_hint().is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_permission_denied_is_reported_as_filesystem_failure() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let platform_err =
            PlatformError::from_io("write_file", std::path::Path::new("/scratch"), &io_err);
        assert!(matches!(platform_err, PlatformError::PermissionDenied { .. }));
        assert_eq!(platform_err.user_code(), Some("platform.permission_denied"));

        let staging_err: StagingError = platform_err.into();
        assert!(staging_err.is_retryable());
        assert!(staging_err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_corrupted_manifest_code() {
        let err: Error = StorageError::CorruptedData {
            message: "manifest line 3: invalid hash".into(),
        }
        .into();
        assert_eq!(err.user_code(), Some("storage.corrupted_data"));
        assert!(err.user_hint().is_some());
    }
}
