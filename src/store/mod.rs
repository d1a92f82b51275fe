//! Durable state journal
//!
//! Every RiskState mutation is followed by an appended snapshot so a
//! restart can reconstruct current exposure from position data without
//! replaying external orders. JSON lines, last parseable line wins.

use crate::risk::{Position, PositionBook, RiskState};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// One durable snapshot of portfolio state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
    /// Portfolio value at snapshot time
    pub portfolio_value: Decimal,
    /// Realized P&L accumulated by the position book
    pub realized_pnl: Decimal,
    /// Open positions
    pub positions: Vec<Position>,
    /// When the daily anchor was last set
    pub anchor_at: DateTime<Utc>,
    /// Total P&L at the daily anchor
    pub daily_anchor_pnl: Decimal,
    /// Portfolio value at the daily anchor
    pub daily_anchor_value: Decimal,
}

impl StateSnapshot {
    /// Capture the durable fields of a state
    pub fn capture(state: &RiskState) -> Self {
        Self {
            timestamp: Utc::now(),
            portfolio_value: state.portfolio_value,
            realized_pnl: state.book.realized_pnl(),
            positions: state.book.positions().cloned().collect(),
            anchor_at: state.anchor_at(),
            daily_anchor_pnl: state.daily_anchor_pnl(),
            daily_anchor_value: state.daily_anchor_value(),
        }
    }

    /// Rebuild a state, recomputing derived fields from position data
    pub fn restore(self) -> RiskState {
        let book = PositionBook::restore(self.positions, self.realized_pnl);
        RiskState::recover(
            book,
            self.portfolio_value,
            self.anchor_at,
            self.daily_anchor_pnl,
            self.daily_anchor_value,
        )
    }
}

/// Append-only snapshot journal
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store backed by the given journal file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append a snapshot; called after every state mutation
    pub fn append(&self, snapshot: &StateSnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(snapshot)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Load the most recent snapshot, if any
    ///
    /// A trailing line torn by a crash is skipped rather than fatal.
    pub fn load_latest(&self) -> anyhow::Result<Option<StateSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        for line in contents.lines().rev() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StateSnapshot>(line) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unparseable journal line");
                }
            }
        }
        Ok(None)
    }
}
