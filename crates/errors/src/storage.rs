//! Stored data error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum StorageError {
    /// A recorded hash or manifest could not be parsed
    #[error("corrupted data: {message}")]
    CorruptedData { message: String },
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CorruptedData { .. } => {
                Some("Restage the module to regenerate its metadata.txt.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Self::CorruptedData { .. } => Some("storage.corrupted_data"),
        }
    }
}
