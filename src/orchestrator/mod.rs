//! Orchestration loop
//!
//! Drives the cycle state machine: pre risk check, aggregation,
//! execution, post risk check, sleep. One cycle at a time per
//! portfolio, serialized by the state lock. Shutdown is honored at
//! state-machine boundaries, never mid-submission.

use crate::aggregator::Aggregator;
use crate::execution::{ExecutionEngine, ExecutionResult};
use crate::market::MarketData;
use crate::risk::{Decision, RiskGate, RiskState};
use crate::signal::SourceRegistry;
use crate::store::{SnapshotStore, StateSnapshot};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Cycle state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Waiting for the first timer fire
    Idle,
    /// Risk gate pre-check
    PreRiskCheck,
    /// Collecting and merging signals
    Aggregating,
    /// Executing intents
    Executing,
    /// Risk gate post-check
    PostRiskCheck,
    /// Waiting for the next timer fire
    Sleeping,
}

/// Scheduler configuration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between trading cycles
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
}

fn default_cycle_interval_secs() -> u64 {
    900
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: 900,
        }
    }
}

/// What one cycle did, for logging and tests
#[derive(Debug)]
pub struct CycleReport {
    /// Cycle identifier
    pub cycle_id: u64,
    /// Pre-check decision
    pub pre_decision: Decision,
    /// Results for executed intents, in priority order
    pub executions: Vec<ExecutionResult>,
    /// Post-check decision, when the post-check ran
    pub post_decision: Option<Decision>,
}

/// Top-level scheduler for one portfolio
pub struct Orchestrator {
    config: SchedulerConfig,
    registry: SourceRegistry,
    aggregator: Aggregator,
    gate: RiskGate,
    engine: Arc<ExecutionEngine>,
    market: Arc<dyn MarketData>,
    state: Arc<Mutex<RiskState>>,
    store: SnapshotStore,
    cycle_counter: u64,
    phase: CyclePhase,
}

impl Orchestrator {
    /// Assemble the loop around its components
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SchedulerConfig,
        registry: SourceRegistry,
        aggregator: Aggregator,
        gate: RiskGate,
        engine: Arc<ExecutionEngine>,
        market: Arc<dyn MarketData>,
        state: RiskState,
        store: SnapshotStore,
    ) -> Self {
        Self {
            config,
            registry,
            aggregator,
            gate,
            engine,
            market,
            state: Arc::new(Mutex::new(state)),
            store,
            cycle_counter: 0,
            phase: CyclePhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Shared handle to the portfolio state
    pub fn state(&self) -> Arc<Mutex<RiskState>> {
        self.state.clone()
    }

    /// Risk gate, for audit inspection
    pub fn gate(&self) -> &RiskGate {
        &self.gate
    }

    fn set_phase(&mut self, phase: CyclePhase) {
        tracing::debug!(phase = ?phase, "Cycle phase transition");
        self.phase = phase;
    }

    /// Run cycles until the shutdown signal fires
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.cycle_interval_secs));
        tracing::info!(
            interval_secs = self.config.cycle_interval_secs,
            sources = self.registry.len(),
            "Orchestrator started"
        );

        loop {
            let boundary_signal = shutdown.clone();
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.run_cycle(&boundary_signal).await;
                    match report {
                        Ok(report) => {
                            tracing::info!(
                                cycle = report.cycle_id,
                                pre = ?report.pre_decision,
                                executed = report.executions.len(),
                                post = ?report.post_decision,
                                "Cycle complete"
                            );
                        }
                        Err(e) => {
                            // Component errors are typed results; only
                            // infrastructure failures land here
                            tracing::error!(error = %e, "Cycle failed");
                        }
                    }
                    if *boundary_signal.borrow() {
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.set_phase(CyclePhase::Idle);
        tracing::info!("Orchestrator stopped");
        Ok(())
    }

    /// Run one full trading cycle
    ///
    /// The state lock is held for the whole cycle: no two cycles for
    /// this portfolio can interleave.
    pub async fn run_cycle(
        &mut self,
        shutdown: &watch::Receiver<bool>,
    ) -> anyhow::Result<CycleReport> {
        self.cycle_counter += 1;
        let cycle_id = self.cycle_counter;
        metrics::counter!("swarmtrader_cycles_total").increment(1);

        let state = self.state.clone();
        let mut state = state.lock().await;

        // Pre risk check brackets the cycle; a feed outage fails safe
        self.set_phase(CyclePhase::PreRiskCheck);
        let portfolio_value = match self.market.get_portfolio_value().await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Portfolio value unavailable, skipping cycle");
                self.set_phase(CyclePhase::Sleeping);
                return Ok(CycleReport {
                    cycle_id,
                    pre_decision: Decision::Reject,
                    executions: vec![],
                    post_decision: None,
                });
            }
        };
        self.refresh_marks(&mut state).await;
        let pre_decision = self.gate.pre_check(&mut state, portfolio_value, cycle_id).await;
        self.persist(&state);

        if pre_decision != Decision::Approve {
            // Rejected cycles skip aggregation and execution entirely
            self.set_phase(CyclePhase::Sleeping);
            return Ok(CycleReport {
                cycle_id,
                pre_decision,
                executions: vec![],
                post_decision: None,
            });
        }

        self.set_phase(CyclePhase::Aggregating);
        let intents = self.aggregator.collect(&self.registry, cycle_id).await;

        self.set_phase(CyclePhase::Executing);
        let mut executions = Vec::with_capacity(intents.len());
        for intent in intents {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, stopping before next intent");
                break;
            }
            if self.gate.limits().is_excluded(&intent.instrument_id) {
                tracing::debug!(
                    instrument = %intent.instrument_id,
                    "Skipping excluded instrument"
                );
                continue;
            }
            let result = self.engine.execute(intent, &mut state).await;
            self.persist(&state);
            executions.push(result);
        }

        // Post risk check always follows execution, even after shutdown
        self.set_phase(CyclePhase::PostRiskCheck);
        let portfolio_value = self
            .market
            .get_portfolio_value()
            .await
            .unwrap_or(state.portfolio_value);
        self.refresh_marks(&mut state).await;
        let post_decision = self
            .gate
            .post_check(&mut state, portfolio_value, cycle_id, self.engine.as_ref())
            .await;
        self.persist(&state);

        self.set_phase(CyclePhase::Sleeping);
        Ok(CycleReport {
            cycle_id,
            pre_decision,
            executions,
            post_decision: Some(post_decision),
        })
    }

    /// Mark open positions to the latest observed prices
    async fn refresh_marks(&self, state: &mut RiskState) {
        for instrument in state.book.instruments() {
            match self.market.get_price(&instrument).await {
                Ok(Some(price)) => state.book.mark(&instrument, price),
                Ok(None) => {
                    tracing::debug!(instrument = %instrument, "No price for mark");
                }
                Err(e) => {
                    tracing::warn!(instrument = %instrument, error = %e, "Mark refresh failed");
                }
            }
        }
    }

    /// Journal the state; a write failure is logged, not fatal mid-cycle
    fn persist(&self, state: &RiskState) {
        if let Err(e) = self.store.append(&StateSnapshot::capture(state)) {
            tracing::error!(error = %e, "Failed to journal state snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::DenyAdvisor;
    use crate::aggregator::AggregatorConfig;
    use crate::execution::{ExecutionConfig, PaperVenue};
    use crate::market::SimMarketData;
    use crate::risk::{AuditLog, RiskLimits};
    use crate::signal::{Direction, Signal, SignalError, SignalSource};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct StaticSource {
        direction: Direction,
        strength: Decimal,
    }

    #[async_trait]
    impl SignalSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        fn instrument_id(&self) -> &str {
            "SOL"
        }

        async fn produce_signal(&self) -> Result<Signal, SignalError> {
            Ok(Signal::new("SOL", self.direction, self.strength, "static"))
        }
    }

    fn orchestrator(
        limits: RiskLimits,
        state: RiskState,
        sim: Arc<SimMarketData>,
        sources: Vec<Arc<dyn SignalSource>>,
        dir: &tempfile::TempDir,
    ) -> Orchestrator {
        let mut registry = SourceRegistry::new();
        for source in sources {
            registry.register(source);
        }
        let venue = Arc::new(PaperVenue::new(sim.clone()));
        let engine = Arc::new(ExecutionEngine::new(
            venue,
            sim.clone(),
            ExecutionConfig {
                max_order_notional: dec!(1000),
                order_pause_ms: 0,
                ..Default::default()
            },
        ));
        let gate = RiskGate::new(limits, Arc::new(DenyAdvisor), AuditLog::in_memory()).unwrap();
        Orchestrator::new(
            SchedulerConfig {
                cycle_interval_secs: 1,
            },
            registry,
            Aggregator::new(AggregatorConfig::default()),
            gate,
            engine,
            sim,
            state,
            SnapshotStore::new(dir.path().join("journal.jsonl")),
        )
    }

    fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn test_full_cycle_executes_intent() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Arc::new(SimMarketData::new(dec!(1000)));
        sim.set_price("SOL", dec!(100)).await;

        let mut orch = orchestrator(
            RiskLimits {
                require_ai_confirmation: false,
                max_loss: dec!(500),
                max_gain: dec!(500),
                ..Default::default()
            },
            RiskState::new(dec!(1000)),
            sim,
            vec![Arc::new(StaticSource {
                direction: Direction::Buy,
                strength: dec!(0.8),
            })],
            &dir,
        );

        let (_tx, rx) = no_shutdown();
        let report = orch.run_cycle(&rx).await.unwrap();

        assert_eq!(report.pre_decision, Decision::Approve);
        assert_eq!(report.executions.len(), 1);
        assert_eq!(report.post_decision, Some(Decision::Approve));

        let state = orch.state();
        let state = state.lock().await;
        assert_eq!(state.book.open_count(), 1);
    }

    #[tokio::test]
    async fn test_pre_check_reject_skips_execution() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Arc::new(SimMarketData::new(dec!(850)));
        sim.set_price("SOL", dec!(50)).await;

        // 4 units bought at 100, now 50: -200 against a 100 loss limit
        let mut state = RiskState::new(dec!(1000));
        state
            .book
            .apply_fill("SOL", Direction::Buy, dec!(400), dec!(100));

        let mut orch = orchestrator(
            RiskLimits {
                require_ai_confirmation: false,
                max_loss: dec!(100),
                max_gain: dec!(100000),
                ..Default::default()
            },
            state,
            sim,
            vec![Arc::new(StaticSource {
                direction: Direction::Buy,
                strength: dec!(0.9),
            })],
            &dir,
        );

        let (_tx, rx) = no_shutdown();
        let report = orch.run_cycle(&rx).await.unwrap();

        assert_eq!(report.pre_decision, Decision::Reject);
        assert!(report.executions.is_empty());
        assert!(report.post_decision.is_none());

        // Position set unchanged: pre-check reject never executes
        let state = orch.state();
        let state = state.lock().await;
        assert_eq!(state.book.open_count(), 1);
        assert_eq!(state.book.get("SOL").unwrap().entry_value, dec!(400));
    }

    #[tokio::test]
    async fn test_excluded_instrument_not_executed() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Arc::new(SimMarketData::new(dec!(1000)));
        sim.set_price("SOL", dec!(100)).await;

        let mut orch = orchestrator(
            RiskLimits {
                require_ai_confirmation: false,
                max_loss: dec!(500),
                max_gain: dec!(500),
                excluded_instruments: vec!["SOL".to_string()],
                ..Default::default()
            },
            RiskState::new(dec!(1000)),
            sim,
            vec![Arc::new(StaticSource {
                direction: Direction::Buy,
                strength: dec!(0.8),
            })],
            &dir,
        );

        let (_tx, rx) = no_shutdown();
        let report = orch.run_cycle(&rx).await.unwrap();

        assert_eq!(report.pre_decision, Decision::Approve);
        assert!(report.executions.is_empty());
    }

    #[tokio::test]
    async fn test_journal_written_after_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Arc::new(SimMarketData::new(dec!(1000)));
        sim.set_price("SOL", dec!(100)).await;

        let mut orch = orchestrator(
            RiskLimits {
                require_ai_confirmation: false,
                max_loss: dec!(500),
                max_gain: dec!(500),
                ..Default::default()
            },
            RiskState::new(dec!(1000)),
            sim,
            vec![Arc::new(StaticSource {
                direction: Direction::Buy,
                strength: dec!(0.8),
            })],
            &dir,
        );

        { let (_tx, rx) = no_shutdown(); orch.run_cycle(&rx).await.unwrap(); }

        let store = SnapshotStore::new(dir.path().join("journal.jsonl"));
        let snapshot = store.load_latest().unwrap().unwrap();
        assert_eq!(snapshot.positions.len(), 1);

        // Restart path: state reconstructed from the journal
        let restored = snapshot.restore();
        assert_eq!(restored.book.open_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_next_intent() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Arc::new(SimMarketData::new(dec!(1000)));
        sim.set_price("AAA", dec!(100)).await;
        sim.set_price("BBB", dec!(100)).await;

        struct NamedSource {
            instrument: &'static str,
        }

        #[async_trait]
        impl SignalSource for NamedSource {
            fn name(&self) -> &str {
                "static"
            }

            fn instrument_id(&self) -> &str {
                self.instrument
            }

            async fn produce_signal(&self) -> Result<Signal, SignalError> {
                Ok(Signal::new(self.instrument, Direction::Buy, dec!(0.8), "static"))
            }
        }

        let mut orch = orchestrator(
            RiskLimits {
                require_ai_confirmation: false,
                max_loss: dec!(500),
                max_gain: dec!(500),
                ..Default::default()
            },
            RiskState::new(dec!(1000)),
            sim,
            vec![
                Arc::new(NamedSource { instrument: "AAA" }),
                Arc::new(NamedSource { instrument: "BBB" }),
            ],
            &dir,
        );

        let (tx, rx) = watch::channel(true);
        let report = orch.run_cycle(&rx).await.unwrap();
        drop(tx);

        // Shutdown was already requested: no intent executes, but the
        // post-check bracket still runs
        assert!(report.executions.is_empty());
        assert!(report.post_decision.is_some());
    }
}
