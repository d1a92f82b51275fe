//! Run command implementation
//!
//! Wires the configured components together, recovers persisted state,
//! and drives the orchestration loop until Ctrl-C.

use crate::advisor::{AnthropicAdvisor, DenyAdvisor, RiskAdvisor};
use crate::aggregator::Aggregator;
use crate::config::{Config, TradingMode};
use crate::execution::{ExecutionEngine, HttpVenue, OrderVenue, PaperVenue};
use crate::market::{HttpMarketData, MarketData, SimMarketData};
use crate::orchestrator::Orchestrator;
use crate::risk::{AuditLog, RiskGate, RiskState};
use crate::signal::{
    CopySource, FixedOpenInterestFeed, FixedSentimentFeed, FixedTrackedPortfolio,
    SentimentSource, SourceRegistry, StrategySource, WhaleSource,
};
use crate::store::SnapshotStore;
use clap::Args;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let market: Arc<dyn MarketData> = match config.portfolio.mode {
            TradingMode::Paper => Arc::new(SimMarketData::seeded(
                &config.portfolio.instruments,
                dec!(100),
                config.portfolio.initial_value,
            )),
            TradingMode::Live => Arc::new(HttpMarketData::new(config.market.clone())),
        };

        let venue: Arc<dyn OrderVenue> = match config.portfolio.mode {
            TradingMode::Paper => Arc::new(PaperVenue::new(market.clone())),
            TradingMode::Live => Arc::new(HttpVenue::new(config.venue.clone())),
        };

        let advisor = build_advisor(config);
        let registry = build_registry(config, market.clone());

        let gate = RiskGate::new(
            config.risk.clone(),
            advisor,
            AuditLog::new(&config.store.audit_path),
        )?;
        let engine = Arc::new(ExecutionEngine::new(
            venue,
            market.clone(),
            config.execution.clone(),
        ));
        let store = SnapshotStore::new(&config.store.journal_path);

        let state = match store.load_latest()? {
            Some(snapshot) => {
                let state = snapshot.restore();
                tracing::info!(
                    open_positions = state.book.open_count(),
                    portfolio_value = %state.portfolio_value,
                    "Recovered state from journal"
                );
                state
            }
            None => RiskState::new(config.portfolio.initial_value),
        };

        let orchestrator = Orchestrator::new(
            config.scheduler.clone(),
            registry,
            Aggregator::new(config.aggregator.clone()),
            gate,
            engine,
            market,
            state,
            store,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
        });

        orchestrator.run(shutdown_rx).await
    }
}

fn build_advisor(config: &Config) -> Arc<dyn RiskAdvisor> {
    if !config.risk.require_ai_confirmation {
        return Arc::new(DenyAdvisor);
    }
    match std::env::var("ANTHROPIC_API_KEY") {
        Ok(key) if !key.is_empty() => {
            Arc::new(AnthropicAdvisor::new(config.advisor.clone(), key))
        }
        _ => {
            tracing::warn!(
                "ANTHROPIC_API_KEY not set, limit breaches will halt without AI review"
            );
            Arc::new(DenyAdvisor)
        }
    }
}

fn build_registry(config: &Config, market: Arc<dyn MarketData>) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    let sentiment_feed = Arc::new(FixedSentimentFeed::new(dec!(0)));
    let oi_feed = Arc::new(FixedOpenInterestFeed::new(dec!(1000)));
    let tracked = Arc::new(FixedTrackedPortfolio::new());

    for instrument in &config.portfolio.instruments {
        if config.risk.is_excluded(instrument) {
            continue;
        }
        for source in &config.signals.enabled {
            match source.as_str() {
                "strategy" => {
                    registry.register(Arc::new(StrategySource::new(instrument, market.clone())));
                }
                "sentiment" if config.portfolio.mode == TradingMode::Paper => {
                    registry.register(Arc::new(SentimentSource::new(
                        instrument,
                        sentiment_feed.clone(),
                    )));
                }
                "whale" if config.portfolio.mode == TradingMode::Paper => {
                    registry.register(Arc::new(WhaleSource::new(instrument, oi_feed.clone())));
                }
                "copybot" if config.portfolio.mode == TradingMode::Paper => {
                    registry.register(Arc::new(CopySource::new(instrument, tracked.clone())));
                }
                other => {
                    tracing::warn!(
                        source = other,
                        instrument = %instrument,
                        "Source has no live feed wired, skipping"
                    );
                }
            }
        }
    }
    registry
}
