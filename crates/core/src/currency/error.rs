//! Error types for currency normalization.

use claimflow_shared::AppError;
use thiserror::Error;

/// Errors that can occur during currency normalization.
#[derive(Debug, Error)]
pub enum CurrencyError {
    /// The code is not a 3-letter alphabetic string.
    #[error("invalid currency code format: {0}")]
    InvalidCode(String),

    /// The code is syntactically valid but outside the supported set, or
    /// absent from an oracle response.
    #[error("unsupported currency: {0}")]
    Unsupported(String),

    /// The submitted amount is not strictly positive.
    #[error("amount must be positive")]
    NonPositiveAmount,

    /// The oracle failed and no cached rate exists to fall back on.
    #[error("exchange rates unavailable: {0}")]
    Unavailable(String),
}

impl From<CurrencyError> for AppError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::InvalidCode(_) | CurrencyError::NonPositiveAmount => {
                Self::Validation(err.to_string())
            }
            CurrencyError::Unsupported(code) => Self::CurrencyUnsupported(code),
            CurrencyError::Unavailable(msg) => Self::CurrencyUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_app_error_kinds() {
        let err = AppError::from(CurrencyError::InvalidCode("us".into()));
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_FAILED");

        let err = AppError::from(CurrencyError::NonPositiveAmount);
        assert_eq!(err.error_code(), "VALIDATION_FAILED");

        let err = AppError::from(CurrencyError::Unsupported("XAU".into()));
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "CURRENCY_UNSUPPORTED");

        let err = AppError::from(CurrencyError::Unavailable("timed out".into()));
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.error_code(), "CURRENCY_UNAVAILABLE");
    }
}
