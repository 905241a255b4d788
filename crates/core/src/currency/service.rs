//! The currency normalizer.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

use crate::currency::cache::RateCache;
use crate::currency::codes::{is_supported, validate_code};
use crate::currency::convert::{convert_amount, round_amount};
use crate::currency::error::CurrencyError;
use crate::currency::oracle::RateOracle;

/// A completed normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// The amount in the target currency, rounded to 2 decimal places.
    pub amount: Decimal,
    /// The rate applied (1 for same-currency submissions).
    pub rate: Decimal,
    /// True when the rate came from an entry past the freshness window.
    pub stale: bool,
}

/// Converts submitted amounts into the company base currency.
///
/// One instance is constructed at startup and shared across handlers;
/// the cache inside is concurrency-safe.
#[derive(Clone)]
pub struct Normalizer {
    cache: RateCache,
    oracle: Arc<dyn RateOracle>,
}

impl Normalizer {
    /// Creates a normalizer over the given oracle.
    #[must_use]
    pub fn new(oracle: Arc<dyn RateOracle>) -> Self {
        Self {
            cache: RateCache::new(),
            oracle,
        }
    }

    /// Returns the underlying cache (for stats and tests).
    #[must_use]
    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    /// Converts `amount` from `from_code` into `to_code`.
    ///
    /// Same-code submissions never touch the oracle. Otherwise a fresh
    /// cache entry wins; a cache miss (or stale entry) triggers an oracle
    /// fetch whose whole rate table is cached; on oracle failure any
    /// cached entry, however old, is used as a stale fallback.
    ///
    /// # Errors
    ///
    /// - `CurrencyError::InvalidCode` / `Unsupported` for bad codes
    /// - `CurrencyError::NonPositiveAmount` for amounts <= 0
    /// - `CurrencyError::Unsupported` when the oracle response lacks the
    ///   target code
    /// - `CurrencyError::Unavailable` when the oracle fails and nothing
    ///   is cached
    pub async fn normalize(
        &self,
        amount: Decimal,
        from_code: &str,
        to_code: &str,
    ) -> Result<Conversion, CurrencyError> {
        if amount <= Decimal::ZERO {
            return Err(CurrencyError::NonPositiveAmount);
        }

        let from = validate_code(from_code)?;
        let to = validate_code(to_code)?;

        if from == to {
            return Ok(Conversion {
                amount: round_amount(amount),
                rate: Decimal::ONE,
                stale: false,
            });
        }

        if let Some(entry) = self.cache.lookup(&from, &to) {
            if entry.is_fresh() {
                return Ok(Conversion {
                    amount: convert_amount(amount, entry.rate),
                    rate: entry.rate,
                    stale: false,
                });
            }
        }

        match self.oracle.fetch_rates(&from).await {
            Ok(rates) => {
                for (code, rate) in &rates {
                    if is_supported(code) {
                        self.cache.store(&from, code, *rate);
                    }
                }

                let rate = rates
                    .get(&to)
                    .copied()
                    .ok_or_else(|| CurrencyError::Unsupported(to.clone()))?;

                Ok(Conversion {
                    amount: convert_amount(amount, rate),
                    rate,
                    stale: false,
                })
            }
            Err(err) => {
                if let Some(entry) = self.cache.lookup(&from, &to) {
                    warn!(
                        from = %from,
                        to = %to,
                        error = %err,
                        "oracle unavailable, converting with stale cached rate"
                    );
                    return Ok(Conversion {
                        amount: convert_amount(amount, entry.rate),
                        rate: entry.rate,
                        stale: true,
                    });
                }

                Err(CurrencyError::Unavailable(err.to_string()))
            }
        }
    }
}
