//! Order submission venues
//!
//! The venue is an external collaborator; the engine only sees the
//! [`OrderVenue`] trait. The paper venue fills at the current simulated
//! market price; the HTTP venue forwards to an external order service.

use super::types::{OrderAck, OrderRequest, SubmitError};
use crate::market::MarketData;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for order submission implementations
#[async_trait]
pub trait OrderVenue: Send + Sync {
    /// Price the venue would currently fill at
    async fn quote(&self, instrument_id: &str) -> Result<Decimal, SubmitError>;

    /// Submit an order; duplicate submissions of the same
    /// `submission_id` must be answered with the original fill
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck, SubmitError>;
}

/// Paper venue with simulated immediate fills
pub struct PaperVenue {
    market: Arc<dyn MarketData>,
    fills: Arc<RwLock<Vec<OrderAck>>>,
}

impl PaperVenue {
    /// Create a paper venue filling at the provider's current price
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self {
            market,
            fills: Arc::new(RwLock::new(vec![])),
        }
    }

    /// All fills so far
    pub async fn fills(&self) -> Vec<OrderAck> {
        let fills = self.fills.read().await;
        fills.clone()
    }
}

#[async_trait]
impl OrderVenue for PaperVenue {
    async fn quote(&self, instrument_id: &str) -> Result<Decimal, SubmitError> {
        self.market
            .get_price(instrument_id)
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?
            .ok_or_else(|| SubmitError::Transient(format!("no price for {}", instrument_id)))
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck, SubmitError> {
        {
            // Duplicate submission: answer with the original fill
            let fills = self.fills.read().await;
            if let Some(existing) = fills
                .iter()
                .find(|f| f.submission_id == request.submission_id)
            {
                tracing::debug!(submission = %request.submission_id, "Duplicate paper submission");
                return Ok(existing.clone());
            }
        }

        let price = self
            .market
            .get_price(&request.instrument_id)
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?
            .ok_or_else(|| {
                SubmitError::Transient(format!("no price for {}", request.instrument_id))
            })?;

        let ack = OrderAck {
            submission_id: request.submission_id,
            fill_price: price,
            fill_notional: request.notional,
            tx_id: Uuid::new_v4().to_string(),
        };

        let mut fills = self.fills.write().await;
        fills.push(ack.clone());

        tracing::info!(
            instrument = %request.instrument_id,
            direction = ?request.direction,
            notional = %request.notional,
            price = %price,
            "Paper order filled"
        );
        Ok(ack)
    }
}

/// Configuration for the HTTP order venue
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// Base URL of the order service
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8901".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Venue forwarding orders to an external HTTP order service
pub struct HttpVenue {
    config: VenueConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    status: String,
    fill_price: Decimal,
    fill_notional: Decimal,
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: Decimal,
}

impl HttpVenue {
    /// Create a new HTTP venue client
    pub fn new(config: VenueConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl OrderVenue for HttpVenue {
    async fn quote(&self, instrument_id: &str) -> Result<Decimal, SubmitError> {
        let url = format!("{}/quote/{}", self.config.base_url, instrument_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SubmitError::Transient(format!(
                "quote service {}",
                response.status()
            )));
        }

        let body: QuoteResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?;
        Ok(body.price)
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck, SubmitError> {
        let url = format!("{}/orders", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 || status.as_u16() == 408 {
            return Err(SubmitError::Transient(format!("order service {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Terminal(format!(
                "order service {}: {}",
                status, body
            )));
        }

        let body: OrderResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::Transient(e.to_string()))?;

        if body.status != "filled" {
            return Err(SubmitError::Terminal(format!(
                "order not filled: {}",
                body.status
            )));
        }

        Ok(OrderAck {
            submission_id: request.submission_id,
            fill_price: body.fill_price,
            fill_notional: body.fill_notional,
            tx_id: body.tx_id,
        })
    }
}
