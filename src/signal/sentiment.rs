//! Sentiment signal source
//!
//! Reads an aggregate sentiment score in [-1, 1] from an external feed
//! and maps it to a directional signal. Scores inside the neutral band
//! produce no directional view.

use super::{Direction, Signal, SignalError, SignalSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// External sentiment feed contract
#[async_trait]
pub trait SentimentFeed: Send + Sync {
    /// Latest aggregate sentiment score in [-1, 1]
    async fn latest_score(&self, instrument_id: &str) -> anyhow::Result<Decimal>;
}

/// Feed returning a fixed score, for paper mode and tests
pub struct FixedSentimentFeed {
    score: Decimal,
}

impl FixedSentimentFeed {
    /// Create a feed that always returns `score`
    pub fn new(score: Decimal) -> Self {
        Self { score }
    }
}

#[async_trait]
impl SentimentFeed for FixedSentimentFeed {
    async fn latest_score(&self, _instrument_id: &str) -> anyhow::Result<Decimal> {
        Ok(self.score)
    }
}

/// Signal source driven by aggregate sentiment
pub struct SentimentSource {
    instrument_id: String,
    feed: Arc<dyn SentimentFeed>,
    /// Scores with |score| below this threshold stay neutral
    neutral_band: Decimal,
}

impl SentimentSource {
    /// Create a new sentiment source with the default 0.3 neutral band
    pub fn new(instrument_id: impl Into<String>, feed: Arc<dyn SentimentFeed>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            feed,
            neutral_band: dec!(0.3),
        }
    }

    /// Override the neutral band
    pub fn with_neutral_band(mut self, band: Decimal) -> Self {
        self.neutral_band = band;
        self
    }
}

#[async_trait]
impl SignalSource for SentimentSource {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    async fn produce_signal(&self) -> Result<Signal, SignalError> {
        let score = self
            .feed
            .latest_score(&self.instrument_id)
            .await
            .map_err(|e| SignalError::Unavailable(e.to_string()))?;

        let score = score.clamp(dec!(-1), dec!(1));
        let direction = if score >= self.neutral_band {
            Direction::Buy
        } else if score <= -self.neutral_band {
            Direction::Sell
        } else {
            Direction::Neutral
        };

        Ok(
            Signal::new(&self.instrument_id, direction, score.abs(), self.name())
                .with_metadata("score", serde_json::json!(score.to_string())),
        )
    }
}
