//! Signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Open or extend a long position
    Buy,
    /// Reduce or close a long position
    Sell,
    /// No directional view
    Neutral,
}

impl Direction {
    /// Signed multiplier for weighted sums
    pub fn signum(&self) -> Decimal {
        match self {
            Direction::Buy => dec!(1),
            Direction::Sell => dec!(-1),
            Direction::Neutral => dec!(0),
        }
    }
}

/// Error raised by a signal source
#[derive(Debug, Error)]
pub enum SignalError {
    /// The source could not produce a signal this cycle
    #[error("signal source unavailable: {0}")]
    Unavailable(String),
}

/// A directional trading suggestion produced by one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Instrument the signal refers to
    pub instrument_id: String,
    /// Trade direction
    pub direction: Direction,
    /// Confidence strength in [0, 1]
    pub strength: Decimal,
    /// Name of the producing source
    pub source: String,
    /// Source-specific context
    pub metadata: HashMap<String, serde_json::Value>,
    /// Signal generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Create a new signal; strength is clamped into [0, 1]
    pub fn new(
        instrument_id: impl Into<String>,
        direction: Direction,
        strength: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            direction,
            strength: strength.clamp(Decimal::ZERO, Decimal::ONE),
            source: source.into(),
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
