//! Whale watcher source
//!
//! Tracks open-interest changes over a lookback window. Rising open
//! interest reads as accumulating size behind the move (bullish),
//! falling open interest as unwinding (bearish).

use super::{Direction, Signal, SignalError, SignalSource};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// External open-interest feed contract
#[async_trait]
pub trait OpenInterestFeed: Send + Sync {
    /// Current open interest for an instrument
    async fn open_interest(&self, instrument_id: &str) -> anyhow::Result<Decimal>;
}

/// Feed returning a fixed open interest, for paper mode and tests
pub struct FixedOpenInterestFeed {
    value: Arc<RwLock<Decimal>>,
}

impl FixedOpenInterestFeed {
    /// Create a feed that returns `value` until changed
    pub fn new(value: Decimal) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Update the returned open interest
    pub async fn set(&self, value: Decimal) {
        let mut v = self.value.write().await;
        *v = value;
    }
}

#[async_trait]
impl OpenInterestFeed for FixedOpenInterestFeed {
    async fn open_interest(&self, _instrument_id: &str) -> anyhow::Result<Decimal> {
        let v = self.value.read().await;
        Ok(*v)
    }
}

/// Signal source tracking open-interest swings
pub struct WhaleSource {
    instrument_id: String,
    feed: Arc<dyn OpenInterestFeed>,
    history: RwLock<VecDeque<(DateTime<Utc>, Decimal)>>,
    /// Lookback used to pick the comparison baseline
    lookback: Duration,
    /// Minimum relative change to produce a directional signal
    min_change_pct: Decimal,
    /// Multiplier mapping relative change to strength
    sensitivity: Decimal,
}

/// History older than this is discarded
const HISTORY_RETENTION_HOURS: i64 = 24;

impl WhaleSource {
    /// Create a new whale source with a 1-hour lookback and 2% threshold
    pub fn new(instrument_id: impl Into<String>, feed: Arc<dyn OpenInterestFeed>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            feed,
            history: RwLock::new(VecDeque::new()),
            lookback: Duration::hours(1),
            min_change_pct: dec!(0.02),
            sensitivity: dec!(10),
        }
    }

    /// Override the lookback window
    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// Baseline open interest at least `lookback` old, if recorded
    async fn baseline(&self, now: DateTime<Utc>) -> Option<Decimal> {
        let history = self.history.read().await;
        let cutoff = now - self.lookback;
        history
            .iter()
            .rev()
            .find(|(ts, _)| *ts <= cutoff)
            .or_else(|| history.front())
            .filter(|(ts, _)| *ts < now)
            .map(|(_, oi)| *oi)
    }

    async fn record(&self, now: DateTime<Utc>, oi: Decimal) {
        let mut history = self.history.write().await;
        history.push_back((now, oi));

        let retention_cutoff = now - Duration::hours(HISTORY_RETENTION_HOURS);
        while let Some((ts, _)) = history.front() {
            if *ts < retention_cutoff {
                history.pop_front();
            } else {
                break;
            }
        }
    }
}

#[async_trait]
impl SignalSource for WhaleSource {
    fn name(&self) -> &str {
        "whale"
    }

    fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    async fn produce_signal(&self) -> Result<Signal, SignalError> {
        let oi = self
            .feed
            .open_interest(&self.instrument_id)
            .await
            .map_err(|e| SignalError::Unavailable(e.to_string()))?;

        let now = Utc::now();
        let baseline = self.baseline(now).await;
        self.record(now, oi).await;

        let Some(baseline) = baseline else {
            // First observation: nothing to compare against yet
            return Ok(Signal::new(
                &self.instrument_id,
                Direction::Neutral,
                dec!(0),
                self.name(),
            ));
        };

        if baseline.is_zero() {
            return Err(SignalError::Unavailable("zero baseline".to_string()));
        }

        let change_pct = (oi - baseline) / baseline;
        let direction = if change_pct >= self.min_change_pct {
            Direction::Buy
        } else if change_pct <= -self.min_change_pct {
            Direction::Sell
        } else {
            Direction::Neutral
        };
        let strength = (change_pct.abs() * self.sensitivity).min(Decimal::ONE);

        Ok(
            Signal::new(&self.instrument_id, direction, strength, self.name())
                .with_metadata("open_interest", serde_json::json!(oi.to_string()))
                .with_metadata("change_pct", serde_json::json!(change_pct.to_string())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_observation_is_neutral() {
        let feed = Arc::new(FixedOpenInterestFeed::new(dec!(1000)));
        let source = WhaleSource::new("SOL", feed);

        let signal = source.produce_signal().await.unwrap();
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.strength, dec!(0));
    }

    #[tokio::test]
    async fn test_rising_open_interest_is_buy() {
        let feed = Arc::new(FixedOpenInterestFeed::new(dec!(1000)));
        let source = WhaleSource::new("SOL", feed.clone()).with_lookback(Duration::zero());

        source.produce_signal().await.unwrap();
        feed.set(dec!(1100)).await;

        let signal = source.produce_signal().await.unwrap();
        assert_eq!(signal.direction, Direction::Buy);
        assert!(signal.strength > dec!(0));
    }

    #[tokio::test]
    async fn test_falling_open_interest_is_sell() {
        let feed = Arc::new(FixedOpenInterestFeed::new(dec!(1000)));
        let source = WhaleSource::new("SOL", feed.clone()).with_lookback(Duration::zero());

        source.produce_signal().await.unwrap();
        feed.set(dec!(900)).await;

        let signal = source.produce_signal().await.unwrap();
        assert_eq!(signal.direction, Direction::Sell);
    }

    #[tokio::test]
    async fn test_small_change_is_neutral() {
        let feed = Arc::new(FixedOpenInterestFeed::new(dec!(1000)));
        let source = WhaleSource::new("SOL", feed.clone()).with_lookback(Duration::zero());

        source.produce_signal().await.unwrap();
        feed.set(dec!(1005)).await;

        let signal = source.produce_signal().await.unwrap();
        assert_eq!(signal.direction, Direction::Neutral);
    }
}
