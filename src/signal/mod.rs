//! Signal sources
//!
//! Each source independently produces a candidate trading signal for one
//! instrument. Sources are registered explicitly at startup; the
//! aggregator queries every enabled source once per cycle.

mod copybot;
mod registry;
mod sentiment;
mod strategy;
mod types;
mod whale;

pub use copybot::{CopySource, FixedTrackedPortfolio, TrackedPortfolio};
pub use registry::SourceRegistry;
pub use sentiment::{FixedSentimentFeed, SentimentFeed, SentimentSource};
pub use strategy::StrategySource;
pub use types::{Direction, Signal, SignalError};
pub use whale::{FixedOpenInterestFeed, OpenInterestFeed, WhaleSource};

use async_trait::async_trait;

/// Trait for signal source implementations
///
/// A source covers exactly one instrument; multi-instrument coverage is a
/// matter of registering one source per instrument.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Stable source name, used for logging and merge weighting
    fn name(&self) -> &str;

    /// Instrument this source covers
    fn instrument_id(&self) -> &str;

    /// Produce this cycle's signal
    async fn produce_signal(&self) -> Result<Signal, SignalError>;
}
