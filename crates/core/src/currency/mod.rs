//! Amount normalization into the company base currency.
//!
//! Conversion runs once per submission, before persistence. Rates come
//! from a process-local cache backed by an external oracle; expired
//! entries survive as a stale fallback when the oracle is unreachable.

pub mod cache;
pub mod codes;
pub mod convert;
pub mod error;
pub mod oracle;
pub mod service;

pub use cache::{CacheStats, CachedRate, RateCache};
pub use codes::{SUPPORTED_CURRENCIES, is_supported, validate_code};
pub use convert::{convert_amount, round_amount};
pub use error::CurrencyError;
pub use oracle::{HttpRateOracle, RateOracle};
pub use service::{Conversion, Normalizer};
