//! Moving-average strategy source
//!
//! Compares a fast and a slow simple moving average over recent candles.
//! The spread between the two, normalized by the slow average, drives
//! both direction and strength.

use super::{Direction, Signal, SignalError, SignalSource};
use crate::market::MarketData;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Signal source based on a fast/slow moving-average crossover
pub struct StrategySource {
    instrument_id: String,
    market: Arc<dyn MarketData>,
    /// Fast moving-average window in candles
    fast_window: usize,
    /// Slow moving-average window in candles
    slow_window: usize,
    /// Multiplier mapping MA spread to strength
    sensitivity: Decimal,
}

impl StrategySource {
    /// Create a new strategy source with default windows (20/40)
    pub fn new(instrument_id: impl Into<String>, market: Arc<dyn MarketData>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            market,
            fast_window: 20,
            slow_window: 40,
            sensitivity: dec!(20),
        }
    }

    /// Override the moving-average windows
    pub fn with_windows(mut self, fast: usize, slow: usize) -> Self {
        self.fast_window = fast.max(1);
        self.slow_window = slow.max(self.fast_window + 1);
        self
    }

    fn mean_close(closes: &[Decimal]) -> Decimal {
        let sum: Decimal = closes.iter().copied().sum();
        sum / Decimal::from(closes.len())
    }
}

#[async_trait]
impl SignalSource for StrategySource {
    fn name(&self) -> &str {
        "strategy"
    }

    fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    async fn produce_signal(&self) -> Result<Signal, SignalError> {
        let candles = self
            .market
            .recent_candles(&self.instrument_id, self.slow_window)
            .await
            .map_err(|e| SignalError::Unavailable(e.to_string()))?;

        if candles.len() < self.slow_window {
            return Err(SignalError::Unavailable(format!(
                "insufficient history: {} of {} candles",
                candles.len(),
                self.slow_window
            )));
        }

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let slow_ma = Self::mean_close(&closes);
        let fast_ma = Self::mean_close(&closes[closes.len() - self.fast_window..]);

        if slow_ma.is_zero() {
            return Err(SignalError::Unavailable("zero slow average".to_string()));
        }

        let spread = (fast_ma - slow_ma) / slow_ma;
        let direction = if spread > Decimal::ZERO {
            Direction::Buy
        } else if spread < Decimal::ZERO {
            Direction::Sell
        } else {
            Direction::Neutral
        };
        let strength = (spread.abs() * self.sensitivity).min(Decimal::ONE);

        Ok(
            Signal::new(&self.instrument_id, direction, strength, self.name())
                .with_metadata("fast_ma", serde_json::json!(fast_ma.to_string()))
                .with_metadata("slow_ma", serde_json::json!(slow_ma.to_string())),
        )
    }
}
