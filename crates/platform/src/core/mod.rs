//! Core platform abstractions and context management

use libstage_errors::PlatformError;
use libstage_events::{
    AppEvent, EventEmitter, EventSender, FailureContext, PlatformEvent, PlatformOperationContext,
    PlatformOperationMetrics,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::filesystem::FilesystemOperations;
use crate::implementations::local::LocalFilesystem;

/// Context for platform operations, providing event emission and correlation
#[derive(Clone, Default)]
pub struct PlatformContext {
    event_sender: Option<EventSender>,
    correlation_id: Option<String>,
}

impl PlatformContext {
    /// Create a new platform context with event emission capabilities
    #[must_use]
    pub fn new(event_sender: Option<EventSender>) -> Self {
        Self {
            event_sender,
            correlation_id: None,
        }
    }

    /// Tag every event emitted through this context
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Execute an operation, emitting started and completed/failed events
    /// around it
    ///
    /// # Errors
    ///
    /// Returns whatever error the wrapped operation returns.
    pub async fn execute_with_events<T, F>(
        &self,
        operation: &str,
        source: Option<&Path>,
        target: &Path,
        f: F,
    ) -> Result<T, PlatformError>
    where
        F: Future<Output = Result<T, PlatformError>>,
    {
        let context = PlatformOperationContext {
            operation: operation.to_string(),
            source: source.map(Path::to_path_buf),
            target: target.to_path_buf(),
        };
        self.emit(AppEvent::Platform(PlatformEvent::OperationStarted {
            context: context.clone(),
        }));

        let start = Instant::now();
        let result = f.await;
        let metrics = metrics(start.elapsed());

        match &result {
            Ok(_) => self.emit(AppEvent::Platform(PlatformEvent::OperationCompleted {
                context,
                metrics,
            })),
            Err(err) => {
                tracing::debug!(operation, target = %target.display(), error = %err, "filesystem operation failed");
                self.emit(AppEvent::Platform(PlatformEvent::OperationFailed {
                    context,
                    failure: FailureContext::from_error(err),
                    metrics,
                }));
            }
        }

        result
    }
}

impl EventEmitter for PlatformContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

fn metrics(duration: Duration) -> PlatformOperationMetrics {
    PlatformOperationMetrics {
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        changes: Vec::new(),
    }
}

/// Main platform abstraction providing access to the filesystem capability
#[derive(Clone)]
pub struct Platform {
    filesystem_ops: Arc<dyn FilesystemOperations>,
}

impl Platform {
    /// Create a new platform instance with the given implementation
    pub fn new(filesystem_ops: Arc<dyn FilesystemOperations>) -> Self {
        Self { filesystem_ops }
    }

    /// Platform backed by the real filesystem
    #[must_use]
    pub fn local() -> Self {
        Self::new(Arc::new(LocalFilesystem::new()))
    }

    /// Access filesystem operations
    #[must_use]
    pub fn filesystem(&self) -> &dyn FilesystemOperations {
        &*self.filesystem_ops
    }

    /// Create a platform context with event emission
    #[must_use]
    pub fn create_context(&self, event_sender: Option<EventSender>) -> PlatformContext {
        PlatformContext::new(event_sender)
    }
}
