//! Staging run events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Lifecycle of one staging run and its steps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StagingEvent {
    RunStarted {
        module: String,
        target: String,
        scratch_dir: PathBuf,
        steps: usize,
    },

    StepStarted {
        /// Step short name, e.g. `copy_native_libraries`
        step: String,
        description: String,
    },

    StepCompleted {
        step: String,
        duration_ms: u64,
    },

    /// A benign condition, such as a source without the requested ABI directory
    StepSkipped {
        step: String,
        reason: String,
    },

    RunCompleted {
        module: String,
        artifacts: Vec<PathBuf>,
        manifest_entries: usize,
        duration_ms: u64,
    },

    RunFailed {
        module: String,
        step: Option<String>,
        failure: FailureContext,
    },
}
