//! Risk gate
//!
//! Admission control for every trading cycle. The gate brackets the
//! cycle: a pre-check before signals are aggregated and a post-check
//! after execution. On a breached limit it either halts outright or
//! escalates to the AI advisor; an advisor failure always resolves to
//! a halt. A post-check breach forces best-effort liquidation of all
//! open positions.

use super::audit::{AuditLog, AuditPhase, AuditRecord};
use super::types::{Decision, LimitBreach, RiskError, RiskLimits};
use super::RiskState;
use crate::advisor::{AdvisorContext, OverrideDecision, RiskAdvisor};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Closes positions on the gate's behalf, bypassing normal sizing
#[async_trait]
pub trait Liquidator: Send + Sync {
    /// Close the full open position; returns the closed notional
    async fn close_position(
        &self,
        instrument_id: &str,
        state: &mut RiskState,
    ) -> anyhow::Result<Decimal>;
}

/// The admission-control component
pub struct RiskGate {
    limits: RiskLimits,
    advisor: Arc<dyn RiskAdvisor>,
    audit: AuditLog,
    last_consult_at: Option<DateTime<Utc>>,
}

impl RiskGate {
    /// Create a gate; malformed limits are fatal
    pub fn new(
        limits: RiskLimits,
        advisor: Arc<dyn RiskAdvisor>,
        audit: AuditLog,
    ) -> Result<Self, RiskError> {
        limits.validate()?;
        Ok(Self {
            limits,
            advisor,
            audit,
            last_consult_at: None,
        })
    }

    /// Configured limits
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Audit log of decisions made by this gate
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Pure evaluation of the current state against the limits
    pub fn evaluate(&self, state: &RiskState) -> Decision {
        match self.limits.breach(state) {
            None => Decision::Approve,
            Some(_) if self.limits.require_ai_confirmation => Decision::Escalate,
            Some(_) => Decision::Reject,
        }
    }

    /// Mandatory check before aggregation
    ///
    /// Rolls the daily anchor, recomputes P&L from position data, and
    /// resolves any escalation. Never returns Escalate.
    pub async fn pre_check(
        &mut self,
        state: &mut RiskState,
        portfolio_value: Decimal,
        cycle_id: u64,
    ) -> Decision {
        let now = Utc::now();
        state.roll_daily(now, self.limits.daily_reset_hour_utc);
        state.recompute(portfolio_value);
        state.last_checked_at = Some(now);
        self.publish_gauges(state);

        match self.limits.breach(state) {
            None => {
                self.record(AuditRecord::new(
                    cycle_id,
                    AuditPhase::Pre,
                    Decision::Approve,
                    "within limits",
                ));
                Decision::Approve
            }
            Some(breach) if !self.limits.require_ai_confirmation => {
                self.record(AuditRecord::new(
                    cycle_id,
                    AuditPhase::Pre,
                    Decision::Reject,
                    breach.to_string(),
                ));
                Decision::Reject
            }
            Some(breach) => {
                self.resolve_escalation(state, breach, cycle_id, AuditPhase::Pre)
                    .await
            }
        }
    }

    /// Mandatory check after execution
    ///
    /// A breach that is not overridden forces liquidation of every
    /// non-excluded open position. This path never silently skips.
    pub async fn post_check(
        &mut self,
        state: &mut RiskState,
        portfolio_value: Decimal,
        cycle_id: u64,
        liquidator: &dyn Liquidator,
    ) -> Decision {
        state.recompute(portfolio_value);
        state.last_checked_at = Some(Utc::now());
        self.publish_gauges(state);

        let Some(breach) = self.limits.breach(state) else {
            self.record(AuditRecord::new(
                cycle_id,
                AuditPhase::Post,
                Decision::Approve,
                "within limits after execution",
            ));
            return Decision::Approve;
        };

        let decision = if self.limits.require_ai_confirmation {
            self.resolve_escalation(state, breach.clone(), cycle_id, AuditPhase::Post)
                .await
        } else {
            self.record(AuditRecord::new(
                cycle_id,
                AuditPhase::Post,
                Decision::Reject,
                breach.to_string(),
            ));
            Decision::Reject
        };

        if decision == Decision::Reject {
            self.liquidate_all(state, cycle_id, liquidator).await;
        }
        decision
    }

    /// Consult the advisor about a breached limit
    ///
    /// Fail-safe: timeout, transport failure, or an unparseable answer
    /// all resolve to Reject. A granted override approves exactly this
    /// cycle; within the consultation cooldown the limit is honored
    /// without asking again.
    async fn resolve_escalation(
        &mut self,
        state: &RiskState,
        breach: LimitBreach,
        cycle_id: u64,
        phase: AuditPhase,
    ) -> Decision {
        let now = Utc::now();
        let cooldown = ChronoDuration::seconds(self.limits.advisor_cooldown_secs as i64);
        if let Some(last) = self.last_consult_at {
            if now - last < cooldown {
                self.record(AuditRecord::new(
                    cycle_id,
                    phase,
                    Decision::Reject,
                    format!("{}; advisor consulted recently, honoring limit", breach),
                ));
                return Decision::Reject;
            }
        }

        let context = AdvisorContext {
            breach: breach.clone(),
            daily_pnl: state.daily_pnl,
            portfolio_value: state.portfolio_value,
            positions: state.book.positions().cloned().collect(),
        };

        let timeout = Duration::from_secs(self.limits.advisor_timeout_secs);
        let outcome = tokio::time::timeout(timeout, self.advisor.ask(&context)).await;
        self.last_consult_at = Some(now);

        match outcome {
            Err(_) => {
                self.record(AuditRecord::new(
                    cycle_id,
                    phase,
                    Decision::Reject,
                    format!(
                        "CollaboratorUnreachable: advisor timed out after {}s; {}",
                        timeout.as_secs(),
                        breach
                    ),
                ));
                Decision::Reject
            }
            Ok(Err(e)) => {
                self.record(AuditRecord::new(
                    cycle_id,
                    phase,
                    Decision::Reject,
                    format!("{}; {}", e, breach),
                ));
                Decision::Reject
            }
            Ok(Ok(verdict)) => match verdict.decision {
                OverrideDecision::OverrideContinue => {
                    metrics::counter!("swarmtrader_gate_overrides_total").increment(1);
                    self.record(
                        AuditRecord::new(
                            cycle_id,
                            AuditPhase::Override,
                            Decision::Approve,
                            format!("override granted for one cycle; {}", breach),
                        )
                        .with_rationale(verdict.rationale),
                    );
                    Decision::Approve
                }
                OverrideDecision::ConfirmHalt => {
                    self.record(
                        AuditRecord::new(
                            cycle_id,
                            phase,
                            Decision::Reject,
                            format!("advisor confirmed halt; {}", breach),
                        )
                        .with_rationale(verdict.rationale),
                    );
                    Decision::Reject
                }
            },
        }
    }

    /// Best-effort close of every non-excluded open position
    async fn liquidate_all(
        &mut self,
        state: &mut RiskState,
        cycle_id: u64,
        liquidator: &dyn Liquidator,
    ) {
        for instrument in state.book.instruments() {
            if self.limits.is_excluded(&instrument) {
                tracing::debug!(instrument = %instrument, "Skipping excluded instrument");
                continue;
            }
            match liquidator.close_position(&instrument, state).await {
                Ok(notional) => {
                    metrics::counter!("swarmtrader_forced_liquidations_total").increment(1);
                    self.record(AuditRecord::new(
                        cycle_id,
                        AuditPhase::Liquidation,
                        Decision::Reject,
                        format!("forced close of {} notional {}", instrument, notional),
                    ));
                }
                Err(e) => {
                    self.record(AuditRecord::new(
                        cycle_id,
                        AuditPhase::Liquidation,
                        Decision::Reject,
                        format!("forced close of {} failed: {}", instrument, e),
                    ));
                }
            }
        }
    }

    fn publish_gauges(&self, state: &RiskState) {
        metrics::gauge!("swarmtrader_daily_pnl")
            .set(state.daily_pnl.to_f64().unwrap_or(0.0));
        metrics::gauge!("swarmtrader_portfolio_value")
            .set(state.portfolio_value.to_f64().unwrap_or(0.0));
        metrics::gauge!("swarmtrader_open_positions").set(state.book.open_count() as f64);
    }

    /// Append an audit record; failures are logged, never fatal mid-cycle
    fn record(&mut self, record: AuditRecord) {
        let decision = record.decision;
        if let Err(e) = self.audit.append(record) {
            tracing::error!(error = %e, "Failed to append audit record");
        }
        let label = match decision {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::Escalate => "escalate",
        };
        metrics::counter!("swarmtrader_gate_decisions_total", "decision" => label).increment(1);
    }
}
