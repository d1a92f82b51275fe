//! Full trading cycle scenarios

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use swarm_trader::advisor::DenyAdvisor;
use swarm_trader::aggregator::{Aggregator, AggregatorConfig};
use swarm_trader::execution::{ExecutionConfig, ExecutionEngine, ExecutionStatus, PaperVenue};
use swarm_trader::market::SimMarketData;
use swarm_trader::orchestrator::{Orchestrator, SchedulerConfig};
use swarm_trader::risk::{AuditLog, Decision, RiskGate, RiskLimits, RiskState};
use swarm_trader::signal::{Direction, Signal, SignalError, SignalSource, SourceRegistry};
use swarm_trader::store::SnapshotStore;
use tokio::sync::watch;

struct StaticSource {
    instrument: &'static str,
    direction: Direction,
    strength: Decimal,
}

#[async_trait]
impl SignalSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn instrument_id(&self) -> &str {
        self.instrument
    }

    async fn produce_signal(&self) -> Result<Signal, SignalError> {
        Ok(Signal::new(
            self.instrument,
            self.direction,
            self.strength,
            "static",
        ))
    }
}

fn execution_config() -> ExecutionConfig {
    ExecutionConfig {
        max_order_notional: dec!(1000),
        order_pause_ms: 0,
        ..Default::default()
    }
}

fn build_orchestrator(
    limits: RiskLimits,
    state: RiskState,
    sim: Arc<SimMarketData>,
    sources: Vec<Arc<dyn SignalSource>>,
    journal: std::path::PathBuf,
) -> Orchestrator {
    let mut registry = SourceRegistry::new();
    for source in sources {
        registry.register(source);
    }
    let venue = Arc::new(PaperVenue::new(sim.clone()));
    let engine = Arc::new(ExecutionEngine::new(venue, sim.clone(), execution_config()));
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
        SnapshotStore::new(journal),
    )
}

fn open_limits() -> RiskLimits {
    RiskLimits {
        max_loss: dec!(100000),
        max_gain: dec!(100000),
        require_ai_confirmation: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_signals_flow_through_to_fills() {
    let dir = tempfile::tempdir().unwrap();
    let sim = Arc::new(SimMarketData::new(dec!(1000)));
    sim.set_price("SOL", dec!(100)).await;
    sim.set_price("FART", dec!(2)).await;

    let mut orch = build_orchestrator(
        open_limits(),
        RiskState::new(dec!(1000)),
        sim,
        vec![
            Arc::new(StaticSource {
                instrument: "SOL",
                direction: Direction::Buy,
                strength: dec!(0.9),
            }),
            Arc::new(StaticSource {
                instrument: "FART",
                direction: Direction::Buy,
                strength: dec!(0.4),
            }),
        ],
        dir.path().join("journal.jsonl"),
    );

    let (_tx, rx) = watch::channel(false);
    let report = orch.run_cycle(&rx).await.unwrap();

    assert_eq!(report.pre_decision, Decision::Approve);
    assert_eq!(report.executions.len(), 2);
    // Strongest intent executes first
    assert_eq!(report.executions[0].intent.instrument_id, "SOL");
    assert_eq!(report.executions[0].status, ExecutionStatus::Filled);
    assert_eq!(report.post_decision, Some(Decision::Approve));

    let state = orch.state();
    let state = state.lock().await;
    assert_eq!(state.book.open_count(), 2);
}

#[tokio::test]
async fn test_breached_pre_check_leaves_positions_untouched() {
    // max_loss 100 with daily pnl -150: the cycle must not trade
    let dir = tempfile::tempdir().unwrap();
    let sim = Arc::new(SimMarketData::new(dec!(850)));
    sim.set_price("SOL", dec!(62.5)).await;

    let mut state = RiskState::new(dec!(1000));
    state
        .book
        .apply_fill("SOL", Direction::Buy, dec!(400), dec!(100));

    let mut orch = build_orchestrator(
        RiskLimits {
            max_loss: dec!(100),
            max_gain: dec!(100000),
            require_ai_confirmation: false,
            ..Default::default()
        },
        state,
        sim,
        vec![Arc::new(StaticSource {
            instrument: "SOL",
            direction: Direction::Buy,
            strength: dec!(1),
        })],
        dir.path().join("journal.jsonl"),
    );

    let (_tx, rx) = watch::channel(false);
    let report = orch.run_cycle(&rx).await.unwrap();

    assert_eq!(report.pre_decision, Decision::Reject);
    assert!(report.executions.is_empty());
    assert!(report.post_decision.is_none());

    let state = orch.state();
    let state = state.lock().await;
    // 4 units at 62.5 is a -150 day; the position set is unchanged
    assert_eq!(state.daily_pnl, dec!(-150));
    assert_eq!(state.book.get("SOL").unwrap().size, dec!(4));
}

#[tokio::test]
async fn test_restart_recovers_positions_from_journal() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("journal.jsonl");
    let sim = Arc::new(SimMarketData::new(dec!(1000)));
    sim.set_price("SOL", dec!(100)).await;

    {
        let mut orch = build_orchestrator(
            open_limits(),
            RiskState::new(dec!(1000)),
            sim.clone(),
            vec![Arc::new(StaticSource {
                instrument: "SOL",
                direction: Direction::Buy,
                strength: dec!(0.8),
            })],
            journal.clone(),
        );
        let (_tx, rx) = watch::channel(false);
        orch.run_cycle(&rx).await.unwrap();
    }

    // "Restart": rebuild state from the journal alone
    let store = SnapshotStore::new(&journal);
    let recovered = store.load_latest().unwrap().unwrap().restore();

    assert_eq!(recovered.book.open_count(), 1);
    let position = recovered.book.get("SOL").unwrap();
    assert_eq!(position.entry_value, dec!(200)); // 1000 * 0.25 * 0.8
}

#[tokio::test]
async fn test_sell_signal_closes_open_position() {
    let dir = tempfile::tempdir().unwrap();
    let sim = Arc::new(SimMarketData::new(dec!(1000)));
    sim.set_price("SOL", dec!(100)).await;

    let mut state = RiskState::new(dec!(1000));
    state
        .book
        .apply_fill("SOL", Direction::Buy, dec!(200), dec!(100));

    let mut orch = build_orchestrator(
        open_limits(),
        state,
        sim,
        vec![Arc::new(StaticSource {
            instrument: "SOL",
            direction: Direction::Sell,
            strength: dec!(0.7),
        })],
        dir.path().join("journal.jsonl"),
    );

    let (_tx, rx) = watch::channel(false);
    let report = orch.run_cycle(&rx).await.unwrap();

    assert_eq!(report.executions.len(), 1);
    assert_eq!(report.executions[0].status, ExecutionStatus::Filled);

    let state = orch.state();
    let state = state.lock().await;
    assert!(state.book.get("SOL").is_none());
}
