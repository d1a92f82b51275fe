//! Check command implementation
//!
//! One-shot evaluation of the persisted risk state against the
//! configured limits, without trading.

use crate::advisor::DenyAdvisor;
use crate::config::Config;
use crate::risk::{AuditLog, RiskGate, RiskState};
use crate::store::SnapshotStore;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct CheckArgs {}

impl CheckArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let gate = RiskGate::new(
            config.risk.clone(),
            Arc::new(DenyAdvisor),
            AuditLog::in_memory(),
        )?;

        let store = SnapshotStore::new(&config.store.journal_path);
        let state = match store.load_latest()? {
            Some(snapshot) => snapshot.restore(),
            None => {
                println!("No persisted state found, using a fresh portfolio");
                RiskState::new(config.portfolio.initial_value)
            }
        };

        let decision = gate.evaluate(&state);

        println!("Portfolio value: {}", state.portfolio_value);
        println!("Daily P&L:       {}", state.daily_pnl);
        println!("Open positions:  {}", state.book.open_count());
        for position in state.book.positions() {
            println!(
                "  {} size {} entry {} current {}",
                position.instrument_id, position.size, position.entry_value, position.current_value
            );
        }
        println!("Loss limit:      {}", gate.limits().loss_limit(&state));
        println!("Gain limit:      {}", gate.limits().gain_limit(&state));
        println!("Decision:        {:?}", decision);

        Ok(())
    }
}
