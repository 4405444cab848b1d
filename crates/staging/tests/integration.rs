//! Integration tests for native library staging on the real filesystem

#[cfg(test)]
mod tests {
    use libstage_errors::StagingError;
    use libstage_events::{AppEvent, StagingEvent};
    use libstage_hash::Hash;
    use libstage_platform::Platform;
    use libstage_staging::*;
    use libstage_types::{BuildTarget, CpuType, ProjectRootResolver, StrippedObject};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};
    use tokio::fs;

    struct Fixture {
        _dir: TempDir,
        project: PathBuf,
        scratch: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let project = dir.path().join("project");
            let scratch = dir.path().join("buck-out/bin");
            Self {
                _dir: dir,
                project,
                scratch,
            }
        }

        async fn write(&self, relative: &str, contents: &str) {
            let path = self.project.join(relative);
            fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            fs::write(path, contents).await.unwrap();
        }

        fn stager(&self) -> NativeLibraryStager {
            NativeLibraryStager::new(
                Platform::local(),
                Arc::new(ProjectRootResolver::new(&self.project)),
                &self.scratch,
            )
            .with_hash_jobs(4)
        }

        fn run_dir(&self) -> PathBuf {
            self.scratch.join("apps/sample/__native_dex_native__")
        }
    }

    fn builder() -> StagingRequestBuilder {
        StagingRequest::builder("dex", BuildTarget::parse("//apps/sample:native").unwrap())
    }

    async fn read(path: impl AsRef<Path>) -> String {
        fs::read_to_string(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_first_listed_directory_wins() {
        let fixture = Fixture::new();
        fixture.write("a/lib/x.so", "A").await;
        fixture.write("b/lib/x.so", "B").await;
        fixture.write("c/lib/x.so", "C").await;
        fixture.write("c/lib/y.so", "C").await;

        let request = builder().source_dirs(["a", "b", "c"]).build().unwrap();
        fixture.stager().stage(&request).await.unwrap();

        let libs = fixture.run_dir().join("libs");
        assert_eq!(read(libs.join("lib/x.so")).await, "A");
        assert_eq!(read(libs.join("lib/y.so")).await, "C");
    }

    #[tokio::test]
    async fn test_abi_filter_keeps_only_requested_abi() {
        let fixture = Fixture::new();
        fixture.write("prebuilt/arm64-v8a/libz.so", "arm64").await;
        fixture.write("prebuilt/x86/libz.so", "x86").await;
        // Second source lacks arm64-v8a entirely
        fixture.write("other/x86/libq.so", "x86").await;

        let request = builder()
            .source_dirs(["prebuilt", "other"])
            .cpu_filter(CpuType::Arm64)
            .build()
            .unwrap();
        let outcome = fixture.stager().stage(&request).await.unwrap();

        let libs = fixture.run_dir().join("libs");
        assert!(libs.join("arm64-v8a/libz.so").exists());
        assert!(!libs.join("x86").exists());
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_architecture_produces_no_output() {
        let fixture = Fixture::new();
        fixture.write("prebuilt/x86/libz.so", "x86").await;

        let request = builder()
            .source_dir("prebuilt")
            .cpu_filter(CpuType::parse("sparc64"))
            .build()
            .unwrap();
        let err = fixture.stager().stage(&request).await.unwrap_err();

        assert!(matches!(err, StagingError::UnsupportedArchitecture { .. }));
        assert!(!fixture.scratch.exists());
    }

    #[tokio::test]
    async fn test_unsupported_architecture_keeps_previous_output() {
        let fixture = Fixture::new();
        fixture.write("prebuilt/x86/libz.so", "x86").await;
        fixture.write("gen/libbad.so", "bad").await;

        let good = builder().source_dir("prebuilt").build().unwrap();
        fixture.stager().stage(&good).await.unwrap();
        let manifest_before = read(fixture.run_dir().join("metadata.txt")).await;

        let bad = builder()
            .source_dir("prebuilt")
            .stripped_lib(StrippedObject::new(
                "gen/libbad.so",
                "libbad.so",
                CpuType::parse("sh4"),
                "",
            ))
            .build()
            .unwrap();
        assert!(fixture.stager().stage(&bad).await.is_err());

        assert_eq!(read(fixture.run_dir().join("metadata.txt")).await, manifest_before);
    }

    #[tokio::test]
    async fn test_disguised_executables_are_renamed() {
        let fixture = Fixture::new();
        fixture.write("prebuilt/armeabi/gdbserver-disguised-exe", "exe").await;
        fixture.write("gen/helper-disguised-exe", "asset exe").await;

        let request = builder()
            .source_dir("prebuilt")
            .stripped_lib_asset(StrippedObject::new(
                "gen/helper-disguised-exe",
                "helper-disguised-exe",
                CpuType::Arm,
                "",
            ))
            .build()
            .unwrap();
        let outcome = fixture.stager().stage(&request).await.unwrap();

        let run = fixture.run_dir();
        assert_eq!(read(run.join("libs/armeabi/libgdbserver.so")).await, "exe");
        assert!(!run.join("libs/armeabi/gdbserver-disguised-exe").exists());
        // Asset libraries are never renamed
        assert!(run.join("assetLibs/armeabi/helper-disguised-exe").exists());
        assert_eq!(outcome.renamed, 1);
    }

    #[tokio::test]
    async fn test_manifest_contents_and_determinism() {
        let fixture = Fixture::new();
        fixture.write("gen/a.so", "A").await;
        fixture.write("gen/b.so", "B").await;

        let request = builder()
            .stripped_lib(StrippedObject::new("gen/a.so", "a.so", CpuType::Arm, ""))
            .stripped_lib_asset(StrippedObject::new("gen/b.so", "b.so", CpuType::Arm, ""))
            .build()
            .unwrap();

        let stager = fixture.stager();
        stager.stage(&request).await.unwrap();
        let manifest_path = fixture.run_dir().join("metadata.txt");
        let first = fs::read(&manifest_path).await.unwrap();

        let expected = format!(
            "assetLibs/armeabi/b.so {}\nlibs/armeabi/a.so {}\n",
            Hash::from_data(b"B"),
            Hash::from_data(b"A")
        );
        assert_eq!(String::from_utf8(first.clone()).unwrap(), expected);

        stager.stage(&request).await.unwrap();
        assert_eq!(fs::read(&manifest_path).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_invalid_request_touches_nothing() {
        let fixture = Fixture::new();
        let err = builder().build().unwrap_err();
        assert!(matches!(err, StagingError::InvalidRequest { .. }));
        assert!(!fixture.scratch.exists());
    }

    #[tokio::test]
    async fn test_events_describe_the_run() {
        let fixture = Fixture::new();
        fixture.write("prebuilt/x86/libz.so", "z").await;
        let (tx, mut rx) = libstage_events::channel();

        let request = builder()
            .source_dir("prebuilt")
            .cpu_filters([CpuType::X86, CpuType::Mips])
            .build()
            .unwrap();
        fixture
            .stager()
            .with_event_sender(tx)
            .stage(&request)
            .await
            .unwrap();

        let mut started = None;
        let mut skipped = 0;
        let mut completed = None;
        let mut correlation = None;
        while let Ok(message) = rx.try_recv() {
            let id = message.meta.correlation_id.clone();
            assert!(id.is_some());
            if correlation.is_none() {
                correlation = id.clone();
            }
            assert_eq!(id, correlation);

            match message.event {
                AppEvent::Staging(StagingEvent::RunStarted { steps, .. }) => started = Some(steps),
                AppEvent::Staging(StagingEvent::StepSkipped { step, .. }) => {
                    assert_eq!(step, "copy_native_libraries");
                    skipped += 1;
                }
                AppEvent::Staging(StagingEvent::RunCompleted {
                    manifest_entries,
                    artifacts,
                    ..
                }) => completed = Some((manifest_entries, artifacts.len())),
                _ => {}
            }
        }

        // 3 clean dirs, 2 abi copies, rename, hash
        assert_eq!(started, Some(7));
        assert_eq!(skipped, 1);
        assert_eq!(completed, Some((1, 3)));
    }

    #[tokio::test]
    async fn test_verify_detects_drift() {
        let fixture = Fixture::new();
        fixture.write("prebuilt/x86/liba.so", "a").await;
        fixture.write("prebuilt/x86/libb.so", "b").await;

        let request = builder().source_dir("prebuilt").build().unwrap();
        let stager = fixture.stager();
        let outcome = stager.stage(&request).await.unwrap();
        assert!(stager.verify(&outcome.layout).await.unwrap().is_clean());

        let libs = outcome.layout.libs_root();
        fs::write(libs.join("x86/liba.so"), "tampered").await.unwrap();
        fs::remove_file(libs.join("x86/libb.so")).await.unwrap();
        fs::write(libs.join("x86/libc.so"), "c").await.unwrap();

        let diff = stager.verify(&outcome.layout).await.unwrap();
        assert_eq!(diff.changed, vec!["libs/x86/liba.so".to_string()]);
        assert_eq!(diff.removed, vec!["libs/x86/libb.so".to_string()]);
        assert_eq!(diff.added, vec!["libs/x86/libc.so".to_string()]);
    }

    #[tokio::test]
    async fn test_request_file_drives_a_run() {
        let fixture = Fixture::new();
        fixture.write("prebuilt/arm64-v8a/libz.so", "z").await;
        fixture.write("gen/libfoo.so", "foo").await;

        let request_path = fixture.project.join("native.toml");
        fs::write(
            &request_path,
            r#"
module = "dex"
target = "//apps/sample:native"
source_dirs = ["prebuilt"]
cpu_filters = ["arm64"]

[[stripped_libs]]
path = "gen/libfoo.so"
name = "libfoo.so"
cpu = "arm64"
"#,
        )
        .await
        .unwrap();

        let request = RequestFile::load(&request_path)
            .await
            .unwrap()
            .into_request()
            .unwrap();
        let outcome = fixture.stager().stage(&request).await.unwrap();

        let paths: Vec<_> = outcome
            .manifest
            .entries()
            .iter()
            .map(|entry| entry.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["libs/arm64-v8a/libfoo.so", "libs/arm64-v8a/libz.so"]);
    }
}
