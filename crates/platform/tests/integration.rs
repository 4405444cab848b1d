//! Integration tests for the filesystem capability

#[cfg(test)]
mod tests {
    use libstage_events::{AppEvent, PlatformEvent};
    use libstage_platform::{FilesystemOperations, LocalFilesystem, MemoryFilesystem, Platform, PlatformContext};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn seed_sources(fs: &dyn FilesystemOperations, ctx: &PlatformContext, root: &Path) {
        fs.create_dir_all(ctx, &root.join("a/x86")).await.unwrap();
        fs.create_dir_all(ctx, &root.join("a/armeabi/sub")).await.unwrap();
        fs.write_file(ctx, &root.join("a/x86/libfoo.so"), b"x86 foo")
            .await
            .unwrap();
        fs.write_file(ctx, &root.join("a/armeabi/sub/libbar.so"), b"bar")
            .await
            .unwrap();
    }

    async fn exercise(fs: &dyn FilesystemOperations, root: &Path) {
        let ctx = PlatformContext::default();
        seed_sources(fs, &ctx, root).await;

        let out = root.join("out");
        fs.copy_directory_contents(&ctx, &root.join("a"), &out)
            .await
            .unwrap();

        let files = fs.list_files(&ctx, &out).await.unwrap();
        assert_eq!(
            files,
            vec![out.join("armeabi/sub/libbar.so"), out.join("x86/libfoo.so")]
        );
        assert!(fs.is_dir(&ctx, &out.join("armeabi")).await);
        assert!(!fs.is_dir(&ctx, &out.join("x86/libfoo.so")).await);

        let hash = fs.hash_file(&ctx, &out.join("x86/libfoo.so")).await.unwrap();
        assert_eq!(hash, libstage_hash::Hash::from_data(b"x86 foo"));

        fs.atomic_rename(&ctx, &out.join("x86/libfoo.so"), &out.join("x86/libbaz.so"))
            .await
            .unwrap();
        assert!(!fs.exists(&ctx, &out.join("x86/libfoo.so")).await);
        assert_eq!(
            fs.read_to_string(&ctx, &out.join("x86/libbaz.so")).await.unwrap(),
            "x86 foo"
        );

        fs.remove_dir_all(&ctx, &out).await.unwrap();
        assert!(!fs.exists(&ctx, &out).await);
        assert!(fs.list_files(&ctx, &out).await.unwrap().is_empty());
        // Removing twice is fine
        fs.remove_dir_all(&ctx, &out).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_filesystem_operations() {
        let temp = TempDir::new().unwrap();
        exercise(&LocalFilesystem::new(), temp.path()).await;
    }

    #[tokio::test]
    async fn test_memory_filesystem_operations() {
        exercise(&MemoryFilesystem::new(), Path::new("/work")).await;
    }

    #[tokio::test]
    async fn test_copy_file_overwrites_existing() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let ctx = PlatformContext::default();
        let src = temp.path().join("libnew.so");
        let dst = temp.path().join("libold.so");
        tokio::fs::write(&src, b"new").await.unwrap();
        tokio::fs::write(&dst, b"old").await.unwrap();

        fs.copy_file(&ctx, &src, &dst).await.unwrap();

        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_copy_file_missing_parent_fails() {
        let temp = TempDir::new().unwrap();
        let fs = LocalFilesystem::new();
        let ctx = PlatformContext::default();
        let src = temp.path().join("libfoo.so");
        tokio::fs::write(&src, b"foo").await.unwrap();

        let result = fs
            .copy_file(&ctx, &src, &temp.path().join("missing/libfoo.so"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_operations_emit_platform_events() {
        let (tx, mut rx) = libstage_events::channel();
        let platform = Platform::new(Arc::new(MemoryFilesystem::new()));
        let ctx = platform.create_context(Some(tx)).with_correlation_id("run-1");

        platform
            .filesystem()
            .create_dir_all(&ctx, Path::new("/scratch/libs"))
            .await
            .unwrap();
        let failed = platform
            .filesystem()
            .copy_file(&ctx, Path::new("/nope"), Path::new("/scratch/libs/nope"))
            .await;
        assert!(failed.is_err());

        let mut seen = Vec::new();
        while let Ok(message) = rx.try_recv() {
            assert_eq!(message.meta.correlation_id.as_deref(), Some("run-1"));
            seen.push(message.event);
        }

        assert!(matches!(
            seen.first(),
            Some(AppEvent::Platform(PlatformEvent::OperationStarted { context })) if context.target == PathBuf::from("/scratch/libs")
        ));
        assert!(seen
            .iter()
            .any(|event| matches!(event, AppEvent::Platform(PlatformEvent::OperationCompleted { .. }))));
        assert!(matches!(
            seen.last(),
            Some(AppEvent::Platform(PlatformEvent::OperationFailed { failure, .. })) if failure.code.is_some()
        ));
    }
}
