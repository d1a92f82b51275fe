//! Simulated market data for paper trading and tests

use super::{Candle, MarketData};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory market data with settable prices and portfolio value
pub struct SimMarketData {
    prices: Arc<RwLock<HashMap<String, Decimal>>>,
    candles: Arc<RwLock<HashMap<String, Vec<Candle>>>>,
    portfolio_value: Arc<RwLock<Decimal>>,
}

impl SimMarketData {
    /// Create an empty simulated provider
    pub fn new(portfolio_value: Decimal) -> Self {
        Self {
            prices: Arc::new(RwLock::new(HashMap::new())),
            candles: Arc::new(RwLock::new(HashMap::new())),
            portfolio_value: Arc::new(RwLock::new(portfolio_value)),
        }
    }

    /// Create a provider seeded with a flat price for each instrument
    pub fn seeded(instruments: &[String], price: Decimal, portfolio_value: Decimal) -> Self {
        let mut prices = HashMap::new();
        let mut candles = HashMap::new();
        for instrument in instruments {
            prices.insert(instrument.clone(), price);
            candles.insert(instrument.clone(), flat_history(price, 64));
        }
        Self {
            prices: Arc::new(RwLock::new(prices)),
            candles: Arc::new(RwLock::new(candles)),
            portfolio_value: Arc::new(RwLock::new(portfolio_value)),
        }
    }

    /// Set the current price for an instrument
    pub async fn set_price(&self, instrument_id: &str, price: Decimal) {
        let mut prices = self.prices.write().await;
        prices.insert(instrument_id.to_string(), price);
    }

    /// Set the portfolio value
    pub async fn set_portfolio_value(&self, value: Decimal) {
        let mut pv = self.portfolio_value.write().await;
        *pv = value;
    }

    /// Replace the candle history for an instrument
    pub async fn set_candles(&self, instrument_id: &str, candles: Vec<Candle>) {
        let mut map = self.candles.write().await;
        map.insert(instrument_id.to_string(), candles);
    }
}

fn flat_history(price: Decimal, bars: usize) -> Vec<Candle> {
    let now = Utc::now();
    (0..bars)
        .map(|i| Candle {
            timestamp: now - Duration::minutes((bars - i) as i64),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: dec!(0),
        })
        .collect()
}

#[async_trait]
impl MarketData for SimMarketData {
    async fn get_price(&self, instrument_id: &str) -> anyhow::Result<Option<Decimal>> {
        let prices = self.prices.read().await;
        Ok(prices.get(instrument_id).copied())
    }

    async fn get_portfolio_value(&self) -> anyhow::Result<Decimal> {
        let pv = self.portfolio_value.read().await;
        Ok(*pv)
    }

    async fn recent_candles(
        &self,
        instrument_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<Candle>> {
        let map = self.candles.read().await;
        let candles = map.get(instrument_id).cloned().unwrap_or_default();
        let start = candles.len().saturating_sub(limit);
        Ok(candles[start..].to_vec())
    }
}
