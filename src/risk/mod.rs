//! Risk management module
//!
//! The risk gate, its state, position tracking, and the append-only
//! audit trail of every decision.

mod audit;
mod gate;
mod position;
mod state;
mod types;

pub use audit::{AuditLog, AuditPhase, AuditRecord};
pub use gate::{Liquidator, RiskGate};
pub use position::{Position, PositionBook};
pub use state::RiskState;
pub use types::{Decision, LimitBreach, LimitMode, RiskError, RiskLimits};
