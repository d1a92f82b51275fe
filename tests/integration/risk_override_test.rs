//! Escalation, override, and forced liquidation scenarios

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use swarm_trader::advisor::{
    AdvisorContext, AdvisorError, AdvisorVerdict, OverrideDecision, RiskAdvisor,
};
use swarm_trader::execution::{ExecutionConfig, ExecutionEngine, PaperVenue};
use swarm_trader::market::SimMarketData;
use swarm_trader::risk::{AuditLog, AuditPhase, Decision, RiskGate, RiskLimits, RiskState};
use swarm_trader::signal::Direction;

struct ScriptedAdvisor {
    decision: OverrideDecision,
}

#[async_trait]
impl RiskAdvisor for ScriptedAdvisor {
    async fn ask(&self, _context: &AdvisorContext) -> Result<AdvisorVerdict, AdvisorError> {
        Ok(AdvisorVerdict {
            decision: self.decision,
            rationale: "scripted".to_string(),
        })
    }
}

struct HangingAdvisor;

#[async_trait]
impl RiskAdvisor for HangingAdvisor {
    async fn ask(&self, _context: &AdvisorContext) -> Result<AdvisorVerdict, AdvisorError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!()
    }
}

fn limits() -> RiskLimits {
    RiskLimits {
        max_loss: dec!(100),
        max_gain: dec!(100000),
        require_ai_confirmation: true,
        advisor_timeout_secs: 1,
        ..Default::default()
    }
}

/// 4 units bought at 100, marked to 62.5: a -150 day
fn losing_state() -> RiskState {
    let mut state = RiskState::new(dec!(1000));
    state
        .book
        .apply_fill("SOL", Direction::Buy, dec!(400), dec!(100));
    state.book.mark("SOL", dec!(62.5));
    state.recompute(dec!(850));
    state
}

#[tokio::test]
async fn test_override_grant_lets_cycle_proceed() {
    let mut gate = RiskGate::new(
        limits(),
        Arc::new(ScriptedAdvisor {
            decision: OverrideDecision::OverrideContinue,
        }),
        AuditLog::in_memory(),
    )
    .unwrap();
    let mut state = losing_state();

    let decision = gate.pre_check(&mut state, dec!(850), 1).await;

    assert_eq!(decision, Decision::Approve);
    let grant = &gate.audit().recent()[0];
    assert_eq!(grant.phase, AuditPhase::Override);
    assert_eq!(grant.decision, Decision::Approve);
    assert!(grant.rationale.is_some());
}

#[tokio::test]
async fn test_advisor_timeout_records_unreachable_and_rejects() {
    let mut gate = RiskGate::new(limits(), Arc::new(HangingAdvisor), AuditLog::in_memory())
        .unwrap();
    let mut state = losing_state();

    let decision = gate.pre_check(&mut state, dec!(850), 1).await;

    assert_eq!(decision, Decision::Reject);
    let record = &gate.audit().recent()[0];
    assert!(record.reason.contains("CollaboratorUnreachable"));
}

#[tokio::test]
async fn test_confirmed_halt_liquidates_through_real_engine() {
    // Post-check breach with a ConfirmHalt advisor: the gate drives the
    // execution engine to close the position on the paper venue
    let sim = Arc::new(SimMarketData::new(dec!(850)));
    sim.set_price("SOL", dec!(62.5)).await;
    let venue = Arc::new(PaperVenue::new(sim.clone()));
    let engine = ExecutionEngine::new(
        venue.clone(),
        sim,
        ExecutionConfig {
            max_order_notional: dec!(1000),
            order_pause_ms: 0,
            ..Default::default()
        },
    );

    let mut gate = RiskGate::new(
        limits(),
        Arc::new(ScriptedAdvisor {
            decision: OverrideDecision::ConfirmHalt,
        }),
        AuditLog::in_memory(),
    )
    .unwrap();
    let mut state = losing_state();

    let decision = gate.post_check(&mut state, dec!(850), 3, &engine).await;

    assert_eq!(decision, Decision::Reject);
    assert_eq!(state.book.open_count(), 0);
    // The sale realized the -150 loss
    assert_eq!(state.book.realized_pnl(), dec!(-150));
    assert!(gate
        .audit()
        .recent()
        .iter()
        .any(|r| r.phase == AuditPhase::Liquidation));
    assert_eq!(venue.fills().await.len(), 1);
}

#[tokio::test]
async fn test_excluded_instrument_survives_forced_liquidation() {
    let sim = Arc::new(SimMarketData::new(dec!(850)));
    sim.set_price("SOL", dec!(62.5)).await;
    sim.set_price("USDC", dec!(1)).await;
    let venue = Arc::new(PaperVenue::new(sim.clone()));
    let engine = ExecutionEngine::new(
        venue,
        sim,
        ExecutionConfig {
            max_order_notional: dec!(1000),
            order_pause_ms: 0,
            ..Default::default()
        },
    );

    let mut gate = RiskGate::new(
        RiskLimits {
            excluded_instruments: vec!["USDC".to_string()],
            require_ai_confirmation: false,
            ..limits()
        },
        Arc::new(ScriptedAdvisor {
            decision: OverrideDecision::ConfirmHalt,
        }),
        AuditLog::in_memory(),
    )
    .unwrap();

    let mut state = losing_state();
    state
        .book
        .apply_fill("USDC", Direction::Buy, dec!(50), dec!(1));

    let decision = gate.post_check(&mut state, dec!(850), 1, &engine).await;

    assert_eq!(decision, Decision::Reject);
    assert!(state.book.get("SOL").is_none());
    // The excluded instrument is still held
    assert!(state.book.get("USDC").is_some());
}

#[tokio::test]
async fn test_gain_breach_also_escalates() {
    let mut gate = RiskGate::new(
        RiskLimits {
            max_loss: dec!(100000),
            max_gain: dec!(50),
            require_ai_confirmation: true,
            advisor_timeout_secs: 1,
            ..Default::default()
        },
        Arc::new(ScriptedAdvisor {
            decision: OverrideDecision::OverrideContinue,
        }),
        AuditLog::in_memory(),
    )
    .unwrap();

    // 4 units bought at 100, marked to 120: a +80 day
    let mut state = RiskState::new(dec!(1000));
    state
        .book
        .apply_fill("SOL", Direction::Buy, dec!(400), dec!(100));
    state.book.mark("SOL", dec!(120));
    state.recompute(dec!(1080));

    let decision = gate.pre_check(&mut state, dec!(1080), 1).await;
    assert_eq!(decision, Decision::Approve);
}
