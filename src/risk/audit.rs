//! Append-only audit log of risk decisions
//!
//! Every gate decision is recorded with enough context to reconstruct
//! why the system acted. Records append to a JSON-lines file and are
//! kept in memory for status reporting.

use super::Decision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Which check produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditPhase {
    /// Pre-cycle risk check
    Pre,
    /// Post-execution risk check
    Post,
    /// AI-assisted override resolution
    Override,
    /// Forced liquidation
    Liquidation,
}

/// One audited decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the decision was made
    pub timestamp: DateTime<Utc>,
    /// Cycle the decision belongs to
    pub cycle_id: u64,
    /// Which check produced the record
    pub phase: AuditPhase,
    /// The decision
    pub decision: Decision,
    /// Machine-checkable reason
    pub reason: String,
    /// Advisor rationale, when an advisor was consulted
    pub rationale: Option<String>,
}

impl AuditRecord {
    /// Create a record stamped now
    pub fn new(cycle_id: u64, phase: AuditPhase, decision: Decision, reason: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            cycle_id,
            phase,
            decision,
            reason: reason.into(),
            rationale: None,
        }
    }

    /// Attach an advisor rationale
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Append-only decision log
pub struct AuditLog {
    path: Option<PathBuf>,
    recent: Vec<AuditRecord>,
}

impl AuditLog {
    /// Create a log backed by a JSON-lines file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            recent: vec![],
        }
    }

    /// Create an in-memory log (tests, dry runs)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            recent: vec![],
        }
    }

    /// Append a record; the file write is the durable copy
    pub fn append(&mut self, record: AuditRecord) -> anyhow::Result<()> {
        tracing::info!(
            cycle = record.cycle_id,
            phase = ?record.phase,
            decision = ?record.decision,
            reason = %record.reason,
            "Risk decision"
        );

        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            let line = serde_json::to_string(&record)?;
            writeln!(file, "{}", line)?;
        }

        self.recent.push(record);
        Ok(())
    }

    /// Records appended by this process, oldest first
    pub fn recent(&self) -> &[AuditRecord] {
        &self.recent
    }
}
