//! AI reasoning collaborator
//!
//! The risk gate consults an advisor before honoring a limit breach.
//! The advisor is advisory and untrusted: any failure to answer, or an
//! answer that cannot be parsed, is treated as a confirmation to halt.

mod anthropic;

pub use anthropic::{AdvisorConfig, AnthropicAdvisor};

use crate::risk::{LimitBreach, Position};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the advisor recommends for a breached limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideDecision {
    /// Honor the limit and halt trading
    ConfirmHalt,
    /// Keep trading for one more cycle despite the breach
    OverrideContinue,
}

/// Advisor answer: decision plus free-form rationale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorVerdict {
    /// The recommendation
    pub decision: OverrideDecision,
    /// Why the advisor recommends it
    pub rationale: String,
}

/// Context handed to the advisor with an escalation
#[derive(Debug, Clone, Serialize)]
pub struct AdvisorContext {
    /// The breached limit
    pub breach: LimitBreach,
    /// Daily P&L at escalation time
    pub daily_pnl: Decimal,
    /// Portfolio value at escalation time
    pub portfolio_value: Decimal,
    /// Open positions under consideration
    pub positions: Vec<Position>,
}

/// Advisor failures
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// The advisor could not be reached in time
    #[error("CollaboratorUnreachable: {0}")]
    Unreachable(String),
    /// The advisor answered but the answer could not be parsed
    #[error("unparseable advisor response: {0}")]
    Unparseable(String),
}

/// Trait for AI reasoning collaborator implementations
#[async_trait]
pub trait RiskAdvisor: Send + Sync {
    /// Ask whether a breached limit should be overridden
    async fn ask(&self, context: &AdvisorContext) -> Result<AdvisorVerdict, AdvisorError>;
}

/// Advisor that always confirms the halt
///
/// Used when no AI collaborator is configured, keeping the gate on its
/// fail-safe path.
pub struct DenyAdvisor;

#[async_trait]
impl RiskAdvisor for DenyAdvisor {
    async fn ask(&self, _context: &AdvisorContext) -> Result<AdvisorVerdict, AdvisorError> {
        Ok(AdvisorVerdict {
            decision: OverrideDecision::ConfirmHalt,
            rationale: "no advisor configured".to_string(),
        })
    }
}
