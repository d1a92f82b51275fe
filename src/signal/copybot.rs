//! Copy-trading source
//!
//! Follows a tracked wallet: growth of the wallet's holding in an
//! instrument reads as a buy, shrinkage as a sell. The first
//! observation only establishes the baseline.

use super::{Direction, Signal, SignalError, SignalSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tracked-wallet holdings contract
#[async_trait]
pub trait TrackedPortfolio: Send + Sync {
    /// Current holding value per instrument, in quote currency
    async fn holdings(&self) -> anyhow::Result<HashMap<String, Decimal>>;
}

/// Tracked portfolio with settable holdings, for paper mode and tests
pub struct FixedTrackedPortfolio {
    holdings: Arc<RwLock<HashMap<String, Decimal>>>,
}

impl FixedTrackedPortfolio {
    /// Create an empty tracked portfolio
    pub fn new() -> Self {
        Self {
            holdings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Set the holding value for an instrument
    pub async fn set_holding(&self, instrument_id: &str, value: Decimal) {
        let mut holdings = self.holdings.write().await;
        holdings.insert(instrument_id.to_string(), value);
    }
}

impl Default for FixedTrackedPortfolio {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackedPortfolio for FixedTrackedPortfolio {
    async fn holdings(&self) -> anyhow::Result<HashMap<String, Decimal>> {
        let holdings = self.holdings.read().await;
        Ok(holdings.clone())
    }
}

/// Signal source following a tracked wallet
pub struct CopySource {
    instrument_id: String,
    portfolio: Arc<dyn TrackedPortfolio>,
    last_value: RwLock<Option<Decimal>>,
    /// Minimum relative change in the tracked holding to act on
    min_change_pct: Decimal,
    /// Multiplier mapping relative change to strength
    sensitivity: Decimal,
}

impl CopySource {
    /// Create a new copy source with a 5% change threshold
    pub fn new(instrument_id: impl Into<String>, portfolio: Arc<dyn TrackedPortfolio>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            portfolio,
            last_value: RwLock::new(None),
            min_change_pct: dec!(0.05),
            sensitivity: dec!(5),
        }
    }
}

#[async_trait]
impl SignalSource for CopySource {
    fn name(&self) -> &str {
        "copybot"
    }

    fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    async fn produce_signal(&self) -> Result<Signal, SignalError> {
        let holdings = self
            .portfolio
            .holdings()
            .await
            .map_err(|e| SignalError::Unavailable(e.to_string()))?;
        let value = holdings
            .get(&self.instrument_id)
            .copied()
            .unwrap_or(Decimal::ZERO);

        let mut last = self.last_value.write().await;
        let previous = last.replace(value);

        let Some(previous) = previous else {
            return Ok(Signal::new(
                &self.instrument_id,
                Direction::Neutral,
                dec!(0),
                self.name(),
            ));
        };

        let (direction, change_pct) = if previous.is_zero() {
            if value > Decimal::ZERO {
                // Fresh entry by the tracked wallet
                (Direction::Buy, Decimal::ONE)
            } else {
                (Direction::Neutral, Decimal::ZERO)
            }
        } else {
            let change = (value - previous) / previous;
            let direction = if change >= self.min_change_pct {
                Direction::Buy
            } else if change <= -self.min_change_pct {
                Direction::Sell
            } else {
                Direction::Neutral
            };
            (direction, change)
        };

        let strength = (change_pct.abs() * self.sensitivity).min(Decimal::ONE);

        Ok(
            Signal::new(&self.instrument_id, direction, strength, self.name())
                .with_metadata("tracked_value", serde_json::json!(value.to_string()))
                .with_metadata("change_pct", serde_json::json!(change_pct.to_string())),
        )
    }
}
