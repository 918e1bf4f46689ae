use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::client::{build_client, endpoint, handle_response};
use super::types::LatestRatesResponse;
use crate::config::Config;
use crate::error::{Result, RolysError};
use crate::popup::currency::CurrencyPair;

/// Live exchange-rate lookup.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `pair.to` per one unit of `pair.from`.
    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<f64>;
}

/// HTTP client for `GET /latest?from=..&to=..`
pub struct RatesClient {
    client: Client,
    base_url: String,
}

impl RatesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.rates.base_url.clone(),
            Duration::from_secs(config.packager.timeout_secs),
        )
    }
}

#[async_trait]
impl RateSource for RatesClient {
    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<f64> {
        let (from, to) = (pair.from.code(), pair.to.code());

        let response = self
            .client
            .get(endpoint(&self.base_url, "/latest"))
            .query(&[("from", from), ("to", to)])
            .send()
            .await
            .map_err(|e| RolysError::RemoteService(format!("Request failed: {}", e)))?;

        let body: LatestRatesResponse = handle_response(response).await?;

        match body.rates.get(to) {
            Some(rate) if rate.is_finite() && *rate > 0.0 => Ok(*rate),
            Some(rate) => Err(RolysError::RemoteService(format!(
                "Invalid {} rate in response: {}",
                to, rate
            ))),
            None => Err(RolysError::RemoteService(format!(
                "Rate for {} missing from response",
                to
            ))),
        }
    }
}
