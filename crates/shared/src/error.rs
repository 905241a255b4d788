//! Application-wide error types.

use thiserror::Error;

/// Application error types.
///
/// This is the single error-to-HTTP mapping: every domain error converts
/// into one of these kinds at the transport boundary. Each kind carries
/// a human-readable detail string; the HTTP boundary serializes the kind
/// and the detail and nothing else, so sensitive input never appears in
/// an error payload.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input, missing required fields, out-of-range values.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource not present, or not visible to the caller's company.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Absent or invalid principal.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// State conflict (duplicate row, already-decided slot, terminated expense).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An approve arrived before every earlier slot was approved.
    #[error("Approval out of order: sequence {blocking_sequence} must be decided first")]
    OutOfOrderApproval {
        /// Lowest sequence still blocking the attempted approval.
        blocking_sequence: i32,
    },

    /// A rejection was submitted without a comment.
    #[error("A comment is required when rejecting")]
    CommentRequired,

    /// The oracle response does not carry the requested target currency.
    #[error("Unsupported currency: {0}")]
    CurrencyUnsupported(String),

    /// The oracle failed and no cached rate exists to fall back on.
    #[error("Exchange rates unavailable: {0}")]
    CurrencyUnavailable(String),

    /// An approver cannot be removed while holding pending slots.
    #[error("Pending work blocks removal: {0}")]
    PendingWorkBlocksRemoval(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Uncategorized internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::OutOfOrderApproval { .. }
            | Self::CommentRequired
            | Self::CurrencyUnsupported(_)
            | Self::PendingWorkBlocksRemoval(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::CurrencyUnavailable(_) => 503,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error kind for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::OutOfOrderApproval { .. } => "OUT_OF_ORDER_APPROVAL",
            Self::CommentRequired => "COMMENT_REQUIRED",
            Self::CurrencyUnsupported(_) => "CURRENCY_UNSUPPORTED",
            Self::CurrencyUnavailable(_) => "CURRENCY_UNAVAILABLE",
            Self::PendingWorkBlocksRemoval(_) => "PENDING_WORK_BLOCKS_REMOVAL",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
