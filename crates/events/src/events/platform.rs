//! Filesystem capability events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// What a filesystem operation touched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformOperationContext {
    /// Operation name (e.g. `copy_file`, `rename`)
    pub operation: String,
    pub source: Option<PathBuf>,
    pub target: PathBuf,
}

/// Timing and effect of a finished operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformOperationMetrics {
    pub duration_ms: u64,
    /// Paths created or rewritten, when the implementation tracks them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    OperationStarted {
        context: PlatformOperationContext,
    },
    OperationCompleted {
        context: PlatformOperationContext,
        metrics: PlatformOperationMetrics,
    },
    OperationFailed {
        context: PlatformOperationContext,
        failure: FailureContext,
        metrics: PlatformOperationMetrics,
    },
}
