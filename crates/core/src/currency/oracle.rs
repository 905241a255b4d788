//! Exchange-rate oracle client.
//!
//! The oracle sits behind a trait so the normalizer can be exercised
//! without the network. The production implementation calls an
//! exchangerate-style API returning every rate for a base currency.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors from an oracle call.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The call exceeded the configured deadline.
    #[error("oracle call timed out")]
    Timeout,

    /// Transport or non-success status.
    #[error("oracle request failed: {0}")]
    Http(String),

    /// The body did not parse into a rate table.
    #[error("oracle response malformed: {0}")]
    Malformed(String),
}

/// Source of exchange rates for a base currency.
#[async_trait]
pub trait RateOracle: Send + Sync {
    /// Fetches every rate quoted against `base`.
    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, Decimal>, OracleError>;
}

#[derive(Debug, Deserialize)]
struct OracleResponse {
    rates: HashMap<String, f64>,
}

/// HTTP oracle client with a bounded call deadline.
#[derive(Debug, Clone)]
pub struct HttpRateOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateOracle {
    /// Creates a client for `{base_url}/{code}` lookups.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::Http` if the underlying client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RateOracle for HttpRateOracle {
    async fn fetch_rates(&self, base: &str) -> Result<HashMap<String, Decimal>, OracleError> {
        let url = format!("{}/{base}", self.base_url.trim_end_matches('/'));

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout
            } else {
                OracleError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(OracleError::Http(format!(
                "status {} from {url}",
                response.status()
            )));
        }

        let body: OracleResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        let mut rates = HashMap::with_capacity(body.rates.len());
        for (code, value) in body.rates {
            let rate = Decimal::try_from(value)
                .map_err(|e| OracleError::Malformed(format!("rate for {code}: {e}")))?;
            rates.insert(code.to_ascii_uppercase(), rate);
        }

        Ok(rates)
    }
}
