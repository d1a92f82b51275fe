//! Strategy aggregator
//!
//! Queries every registered signal source concurrently, merges
//! same-instrument signals into a single view, and emits prioritized
//! intents. A failing source is skipped for the cycle, never fatal.

mod merge;

pub use merge::{merge_signals, MergedView};

use crate::signal::{Direction, Signal, SourceRegistry};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// An aggregated, risk-gate-pending candidate trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Instrument to trade
    pub instrument_id: String,
    /// Trade direction (never Neutral once emitted)
    pub direction: Direction,
    /// Combined signal strength driving position sizing
    pub sizing_basis: Decimal,
    /// Signals this intent was derived from, in collection order
    pub originating_signals: Vec<Signal>,
    /// Cycle that produced the intent
    pub cycle_id: u64,
}

/// Aggregator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Per-source query timeout in seconds
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
    /// Minimum combined strength required to form an intent
    #[serde(default = "default_min_intent_strength")]
    pub min_intent_strength: Decimal,
    /// Per-source merge weights; unlisted sources weigh 1
    #[serde(default)]
    pub source_weights: HashMap<String, Decimal>,
}

fn default_source_timeout_secs() -> u64 {
    15
}
fn default_min_intent_strength() -> Decimal {
    dec!(0.1)
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_timeout_secs: 15,
            min_intent_strength: dec!(0.1),
            source_weights: HashMap::new(),
        }
    }
}

/// Collects and merges signals into prioritized intents
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    /// Create a new aggregator
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Query all sources and build this cycle's intents
    ///
    /// Sources run concurrently behind a bounded join: every source
    /// either answers, errors, or times out before merging starts.
    pub async fn collect(&self, registry: &SourceRegistry, cycle_id: u64) -> Vec<Intent> {
        let timeout = Duration::from_secs(self.config.source_timeout_secs);

        let queries = registry.sources().iter().map(|source| {
            let source = source.clone();
            async move {
                let name = source.name().to_string();
                let instrument = source.instrument_id().to_string();
                match tokio::time::timeout(timeout, source.produce_signal()).await {
                    Ok(Ok(signal)) => Some(signal),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            source = %name,
                            instrument = %instrument,
                            error = %e,
                            "Signal source failed, skipping for this cycle"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            source = %name,
                            instrument = %instrument,
                            timeout_secs = timeout.as_secs(),
                            "Signal source timed out, skipping for this cycle"
                        );
                        None
                    }
                }
            }
        });

        let signals: Vec<Signal> = join_all(queries).await.into_iter().flatten().collect();
        self.build_intents(signals, cycle_id)
    }

    /// Merge collected signals into intents, strongest first
    pub fn build_intents(&self, signals: Vec<Signal>, cycle_id: u64) -> Vec<Intent> {
        // BTreeMap keeps instrument order deterministic
        let mut by_instrument: BTreeMap<String, Vec<Signal>> = BTreeMap::new();
        for signal in signals {
            by_instrument
                .entry(signal.instrument_id.clone())
                .or_default()
                .push(signal);
        }

        let mut intents: Vec<Intent> = by_instrument
            .into_iter()
            .filter_map(|(instrument_id, signals)| {
                let merged = merge_signals(&signals, &self.config.source_weights)?;
                if merged.direction == Direction::Neutral {
                    tracing::debug!(instrument = %instrument_id, "Merged view is neutral, no intent");
                    return None;
                }
                if merged.strength < self.config.min_intent_strength {
                    tracing::debug!(
                        instrument = %instrument_id,
                        strength = %merged.strength,
                        "Combined strength below threshold, no intent"
                    );
                    return None;
                }
                Some(Intent {
                    instrument_id,
                    direction: merged.direction,
                    sizing_basis: merged.strength,
                    originating_signals: signals,
                    cycle_id,
                })
            })
            .collect();

        // Strongest first so constrained capital goes to the best idea;
        // instrument id breaks exact strength ties deterministically
        intents.sort_by(|a, b| {
            b.sizing_basis
                .cmp(&a.sizing_basis)
                .then_with(|| a.instrument_id.cmp(&b.instrument_id))
        });

        metrics::counter!("swarmtrader_intents_total").increment(intents.len() as u64);
        intents
    }
}
