//! Market data collaborator boundary
//!
//! Price, portfolio value, and candle retrieval live behind the
//! [`MarketData`] trait so the orchestration core never depends on a
//! specific provider.

mod http;
mod sim;

pub use http::{HttpMarketData, MarketDataConfig};
pub use sim::SimMarketData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV candle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open timestamp
    pub timestamp: DateTime<Utc>,
    /// Open price
    pub open: Decimal,
    /// High price
    pub high: Decimal,
    /// Low price
    pub low: Decimal,
    /// Close price
    pub close: Decimal,
    /// Traded volume
    pub volume: Decimal,
}

/// Trait for market data provider implementations
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Last observed price for an instrument, `None` if unknown
    async fn get_price(&self, instrument_id: &str) -> anyhow::Result<Option<Decimal>>;
    /// Total portfolio value in quote currency
    async fn get_portfolio_value(&self) -> anyhow::Result<Decimal>;
    /// Most recent candles for an instrument, oldest first
    async fn recent_candles(&self, instrument_id: &str, limit: usize)
        -> anyhow::Result<Vec<Candle>>;
}
