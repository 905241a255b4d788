//! Error types for receipt storage.

use claimflow_shared::AppError;
use thiserror::Error;

/// Errors that can occur while storing or removing receipts.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// The store could not be initialized.
    #[error("receipt storage configuration error: {0}")]
    Configuration(String),

    /// The file exceeds the configured size limit.
    #[error("file of {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The media type is not accepted for receipts.
    #[error("media type not accepted for receipts: {0}")]
    UnsupportedMediaType(String),

    /// The underlying storage operation failed.
    #[error("receipt storage error: {0}")]
    Io(String),
}

impl From<ReceiptError> for AppError {
    fn from(err: ReceiptError) -> Self {
        match err {
            ReceiptError::FileTooLarge { .. } | ReceiptError::UnsupportedMediaType(_) => {
                Self::Validation(err.to_string())
            }
            ReceiptError::Configuration(_) | ReceiptError::Io(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
