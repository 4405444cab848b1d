//! Native library staging errors

use std::borrow::Cow;

use crate::{PlatformError, UserFacingError};
use thiserror::Error;

/// Errors that terminate a staging run
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum StagingError {
    #[error("invalid staging request: {message}")]
    InvalidRequest { message: String },

    #[error("unsupported architecture: {cpu_type} has no ABI directory")]
    UnsupportedArchitecture { cpu_type: String },

    #[error("conflicting destination {destination}: claimed by {first} and {second}")]
    ConflictingDestination {
        destination: String,
        first: String,
        second: String,
    },

    #[error("filesystem failure during {operation} on {path}: {message}")]
    FilesystemFailure {
        operation: String,
        path: String,
        message: String,
    },
}

impl StagingError {
    /// Shorthand for an `InvalidRequest`
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Shorthand for a `FilesystemFailure`
    pub fn filesystem(
        operation: impl Into<String>,
        path: &std::path::Path,
        message: impl Into<String>,
    ) -> Self {
        Self::FilesystemFailure {
            operation: operation.into(),
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

impl From<PlatformError> for StagingError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::FilesystemOperationFailed {
                operation,
                path,
                message,
            } => StagingError::FilesystemFailure {
                operation,
                path,
                message,
            },
            PlatformError::PermissionDenied { operation, path } => {
                StagingError::FilesystemFailure {
                    operation,
                    path,
                    message: "permission denied".to_string(),
                }
            }
        }
    }
}

impl UserFacingError for StagingError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidRequest { .. } => Some(
                "Provide at least one source directory, stripped library or stripped asset, and a filesystem-safe module name.",
            ),
            Self::UnsupportedArchitecture { .. } => Some(
                "Use one of: arm, armv7, arm64, x86, x86_64, mips.",
            ),
            Self::ConflictingDestination { .. } => {
                Some("Give each stripped object a unique name per architecture.")
            }
            Self::FilesystemFailure { .. } => {
                Some("Check permissions and free space under the scratch root, then rerun.")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::FilesystemFailure { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidRequest { .. } => "staging.invalid_request",
            Self::UnsupportedArchitecture { .. } => "staging.unsupported_architecture",
            Self::ConflictingDestination { .. } => "staging.conflicting_destination",
            Self::FilesystemFailure { .. } => "staging.filesystem_failure",
        };
        Some(code)
    }
}
