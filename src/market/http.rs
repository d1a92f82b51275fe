//! HTTP-backed market data provider
//!
//! Talks to a price service exposing `/price/{id}`, `/portfolio/value`
//! and `/candles/{id}` endpoints. The service itself is an external
//! collaborator; only the interface boundary is modelled here.

use super::{Candle, MarketData};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the HTTP market data provider
#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    /// Base URL for the price service
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8900".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Client for the external price service
pub struct HttpMarketData {
    config: MarketDataConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct PortfolioResponse {
    value: Decimal,
}

impl HttpMarketData {
    /// Create a new provider with the given configuration
    pub fn new(config: MarketDataConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl MarketData for HttpMarketData {
    async fn get_price(&self, instrument_id: &str) -> anyhow::Result<Option<Decimal>> {
        let url = format!("{}/price/{}", self.config.base_url, instrument_id);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("price service error: {}", status);
        }

        let body: PriceResponse = response.json().await?;
        Ok(body.price)
    }

    async fn get_portfolio_value(&self) -> anyhow::Result<Decimal> {
        let url = format!("{}/portfolio/value", self.config.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("portfolio service error: {}", status);
        }

        let body: PortfolioResponse = response.json().await?;
        Ok(body.value)
    }

    async fn recent_candles(
        &self,
        instrument_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Candle>> {
        let url = format!("{}/candles/{}", self.config.base_url, instrument_id);

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("candle service error: {}", status);
        }

        let candles: Vec<Candle> = response.json().await?;
        Ok(candles)
    }
}
