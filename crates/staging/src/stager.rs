//! Staging orchestrator

use libstage_errors::{Error, StagingError};
use libstage_events::{AppEvent, EventEmitter, EventSender, FailureContext, StagingEvent};
use libstage_platform::{Platform, PlatformContext};
use libstage_types::SourcePathResolver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::layout::StagingLayout;
use crate::manifest::{self, Manifest, ManifestDiff};
use crate::plan::{StagingPlan, StepContext, StepOutcome};
use crate::request::StagingRequest;

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct StagingOutcome {
    pub layout: StagingLayout,
    /// `libs`, `assetLibs` and `metadata.txt`, in that order
    pub artifacts: Vec<PathBuf>,
    pub manifest: Manifest,
    /// Disguised executables renamed to `lib*.so`
    pub renamed: usize,
    /// Reasons for steps that had nothing to do
    pub skipped: Vec<String>,
}

/// Runs staging requests against a platform
#[derive(Clone)]
pub struct NativeLibraryStager {
    platform: Platform,
    resolver: Arc<dyn SourcePathResolver>,
    scratch_root: PathBuf,
    hash_jobs: usize,
    event_sender: Option<EventSender>,
}

impl NativeLibraryStager {
    #[must_use]
    pub fn new(
        platform: Platform,
        resolver: Arc<dyn SourcePathResolver>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            resolver,
            scratch_root: scratch_root.into(),
            hash_jobs: 1,
            event_sender: None,
        }
    }

    /// Hash up to `jobs` files concurrently while writing the manifest
    #[must_use]
    pub fn with_hash_jobs(mut self, jobs: usize) -> Self {
        self.hash_jobs = jobs.max(1);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    #[must_use]
    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Output locations for `request`
    #[must_use]
    pub fn layout(&self, request: &StagingRequest) -> StagingLayout {
        StagingLayout::new(
            &self.scratch_root,
            request.build_target(),
            request.module_name(),
        )
    }

    /// Plan `request` without executing it
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchitecture` if a cpu filter or stripped object has
    /// no ABI directory.
    pub fn plan(&self, request: &StagingRequest) -> Result<StagingPlan, StagingError> {
        StagingPlan::build(request, &self.layout(request), self.resolver.as_ref())
    }

    fn context(&self) -> PlatformContext {
        self.platform
            .create_context(self.event_sender.clone())
            .with_correlation_id(Uuid::new_v4().to_string())
    }

    /// Stage `request`: clean the run directory, merge sources, place stripped
    /// objects, rename disguised executables and write the manifest
    ///
    /// Everything that can be checked without touching the filesystem is
    /// checked before the run directory is cleaned. The first failing step
    /// ends the run and no artifacts are reported.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedArchitecture` before any output is produced, or
    /// `FilesystemFailure` from the failing step.
    pub async fn stage(&self, request: &StagingRequest) -> Result<StagingOutcome, StagingError> {
        let started = Instant::now();
        let ctx = self.context();
        let module = request.module_name().to_string();
        let layout = self.layout(request);

        let plan = match self.plan(request) {
            Ok(plan) => plan,
            Err(err) => {
                ctx.emit(AppEvent::Staging(StagingEvent::RunFailed {
                    module,
                    step: None,
                    failure: FailureContext::from_error(&err),
                }));
                return Err(err);
            }
        };

        tracing::debug!(
            module = %module,
            target = %request.build_target(),
            steps = plan.len(),
            "staging native libraries"
        );
        ctx.emit(AppEvent::Staging(StagingEvent::RunStarted {
            module: module.clone(),
            target: request.build_target().to_string(),
            scratch_dir: layout.all_libs_root().to_path_buf(),
            steps: plan.len(),
        }));

        let fs = self.platform.filesystem();
        let mut manifest = Manifest::default();
        let mut renamed = 0;
        let mut skipped = Vec::new();

        for step in plan.iter() {
            let name = step.short_name();
            ctx.emit(AppEvent::Staging(StagingEvent::StepStarted {
                step: name.to_string(),
                description: step.description(),
            }));
            let step_started = Instant::now();

            match step.execute(StepContext::new(fs, &ctx, self.hash_jobs)).await {
                Ok(StepOutcome::Skipped { reason }) => {
                    ctx.emit(AppEvent::Staging(StagingEvent::StepSkipped {
                        step: name.to_string(),
                        reason: reason.clone(),
                    }));
                    skipped.push(reason);
                    continue;
                }
                Ok(StepOutcome::Renamed(count)) => renamed = count,
                Ok(StepOutcome::Hashed(written)) => manifest = written,
                Ok(StepOutcome::Completed) => {}
                Err(err) => {
                    tracing::debug!(step = name, error = %err, "staging step failed");
                    ctx.emit(AppEvent::Staging(StagingEvent::RunFailed {
                        module,
                        step: Some(name.to_string()),
                        failure: FailureContext::from_error(&err),
                    }));
                    return Err(err);
                }
            }

            ctx.emit(AppEvent::Staging(StagingEvent::StepCompleted {
                step: name.to_string(),
                duration_ms: elapsed_ms(step_started),
            }));
        }

        let artifacts = layout.artifacts();
        ctx.emit(AppEvent::Staging(StagingEvent::RunCompleted {
            module,
            artifacts: artifacts.clone(),
            manifest_entries: manifest.len(),
            duration_ms: elapsed_ms(started),
        }));

        Ok(StagingOutcome {
            layout,
            artifacts,
            manifest,
            renamed,
            skipped,
        })
    }

    /// Re-hash a staged tree and compare it with its recorded manifest
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or parsed, or if the
    /// tree cannot be hashed.
    pub async fn verify(&self, layout: &StagingLayout) -> Result<ManifestDiff, Error> {
        let ctx = self.context();
        ctx.emit_operation_started("verify");

        let diff = match self.diff_against_manifest(&ctx, layout).await {
            Ok(diff) => diff,
            Err(err) => {
                ctx.emit_operation_completed("verify", false);
                return Err(err);
            }
        };

        if !diff.is_clean() {
            let drifted = diff.added.len() + diff.removed.len() + diff.changed.len();
            ctx.emit_warning_with_context(
                format!("{drifted} staged path(s) differ from metadata.txt"),
                layout.manifest_path().display().to_string(),
            );
        }
        ctx.emit_operation_completed("verify", diff.is_clean());
        Ok(diff)
    }

    async fn diff_against_manifest(
        &self,
        ctx: &PlatformContext,
        layout: &StagingLayout,
    ) -> Result<ManifestDiff, Error> {
        let fs = self.platform.filesystem();
        let recorded = manifest::load(fs, ctx, layout.manifest_path()).await?;
        let current = manifest::compute(
            fs,
            ctx,
            layout.all_libs_root(),
            layout.manifest_path(),
            self.hash_jobs,
        )
        .await?;
        Ok(recorded.diff(&current))
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
