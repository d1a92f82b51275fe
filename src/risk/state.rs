//! Process-wide risk state
//!
//! One `RiskState` instance per portfolio, owned by the orchestration
//! loop and mutated only through the risk gate. Daily P&L is always
//! derived from position data, never assigned directly.

use super::position::PositionBook;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of portfolio risk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    /// Last known total portfolio value
    pub portfolio_value: Decimal,
    /// Open positions and realized P&L
    pub book: PositionBook,
    /// P&L accumulated since the last daily boundary
    pub daily_pnl: Decimal,
    /// Total P&L at the last daily boundary
    daily_anchor_pnl: Decimal,
    /// Portfolio value at the last daily boundary
    daily_anchor_value: Decimal,
    /// When the daily anchor was last set
    anchor_at: DateTime<Utc>,
    /// When the risk gate last evaluated this state
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl RiskState {
    /// Create a fresh state anchored at the given portfolio value
    pub fn new(portfolio_value: Decimal) -> Self {
        Self {
            portfolio_value,
            book: PositionBook::new(),
            daily_pnl: Decimal::ZERO,
            daily_anchor_pnl: Decimal::ZERO,
            daily_anchor_value: portfolio_value,
            anchor_at: Utc::now(),
            last_checked_at: None,
        }
    }

    /// Rebuild state from persisted positions
    ///
    /// Derived fields are recomputed from the book; nothing cached in a
    /// previous process is trusted.
    pub fn recover(book: PositionBook, portfolio_value: Decimal, anchor_at: DateTime<Utc>,
                   daily_anchor_pnl: Decimal, daily_anchor_value: Decimal) -> Self {
        let mut state = Self {
            portfolio_value,
            book,
            daily_pnl: Decimal::ZERO,
            daily_anchor_pnl,
            daily_anchor_value,
            anchor_at,
            last_checked_at: None,
        };
        state.recompute(portfolio_value);
        state
    }

    /// Portfolio value at the last daily boundary
    pub fn daily_anchor_value(&self) -> Decimal {
        self.daily_anchor_value
    }

    /// When the daily anchor was last set
    pub fn anchor_at(&self) -> DateTime<Utc> {
        self.anchor_at
    }

    /// Total P&L at the last daily boundary
    pub fn daily_anchor_pnl(&self) -> Decimal {
        self.daily_anchor_pnl
    }

    /// Recompute daily P&L from position data
    pub fn recompute(&mut self, portfolio_value: Decimal) {
        self.portfolio_value = portfolio_value;
        self.daily_pnl = self.book.total_pnl() - self.daily_anchor_pnl;
    }

    /// Reset the daily anchor if the configured UTC boundary has passed
    ///
    /// Returns true when a reset happened.
    pub fn roll_daily(&mut self, now: DateTime<Utc>, reset_hour_utc: u32) -> bool {
        let boundary = most_recent_boundary(now, reset_hour_utc);
        if self.anchor_at >= boundary {
            return false;
        }

        self.daily_anchor_pnl = self.book.total_pnl();
        self.daily_anchor_value = self.portfolio_value;
        self.anchor_at = now;
        self.daily_pnl = Decimal::ZERO;
        tracing::info!(
            anchor_value = %self.daily_anchor_value,
            "Daily risk anchor reset"
        );
        true
    }
}

/// Most recent occurrence of `reset_hour_utc`:00 at or before `now`
fn most_recent_boundary(now: DateTime<Utc>, reset_hour_utc: u32) -> DateTime<Utc> {
    let reset_hour_utc = reset_hour_utc.min(23);
    let today = now.date_naive();
    let candidate = Utc
        .with_ymd_and_hms(
            today.year(),
            today.month(),
            today.day(),
            reset_hour_utc,
            0,
            0,
        )
        .single()
        .unwrap_or(now);
    if now.hour() >= reset_hour_utc {
        candidate
    } else {
        candidate - Duration::days(1)
    }
}
