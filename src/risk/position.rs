//! Position tracking

use crate::signal::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An open position, long only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Instrument identifier
    pub instrument_id: String,
    /// Position size in instrument units
    pub size: Decimal,
    /// Cost basis in quote currency
    pub entry_value: Decimal,
    /// Mark-to-market value in quote currency
    pub current_value: Decimal,
}

impl Position {
    /// Unrealized P&L against the cost basis
    pub fn unrealized_pnl(&self) -> Decimal {
        self.current_value - self.entry_value
    }
}

/// All open positions plus realized P&L accumulated from closes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
    realized_pnl: Decimal,
}

impl PositionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a book from persisted positions and realized P&L
    pub fn restore(positions: Vec<Position>, realized_pnl: Decimal) -> Self {
        Self {
            positions: positions
                .into_iter()
                .map(|p| (p.instrument_id.clone(), p))
                .collect(),
            realized_pnl,
        }
    }

    /// Look up a position
    pub fn get(&self, instrument_id: &str) -> Option<&Position> {
        self.positions.get(instrument_id)
    }

    /// All open positions
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Instrument ids with an open position, sorted for determinism
    pub fn instruments(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.positions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of open positions
    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Total mark-to-market value of open positions
    pub fn total_value(&self) -> Decimal {
        self.positions.values().map(|p| p.current_value).sum()
    }

    /// Unrealized P&L across open positions
    pub fn unrealized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.unrealized_pnl()).sum()
    }

    /// Realized P&L accumulated from closes
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Realized plus unrealized P&L
    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl + self.unrealized_pnl()
    }

    /// Apply a confirmed fill
    ///
    /// Buys create or extend the position; sells reduce it, realizing
    /// P&L proportionally, and remove it once fully offset. A sell
    /// against no position is ignored.
    pub fn apply_fill(
        &mut self,
        instrument_id: &str,
        direction: Direction,
        notional: Decimal,
        fill_price: Decimal,
    ) {
        if fill_price <= Decimal::ZERO || notional <= Decimal::ZERO {
            return;
        }
        let size_delta = notional / fill_price;

        match direction {
            Direction::Buy => {
                let position =
                    self.positions
                        .entry(instrument_id.to_string())
                        .or_insert_with(|| Position {
                            instrument_id: instrument_id.to_string(),
                            size: Decimal::ZERO,
                            entry_value: Decimal::ZERO,
                            current_value: Decimal::ZERO,
                        });
                position.size += size_delta;
                position.entry_value += notional;
                position.current_value = position.size * fill_price;
            }
            Direction::Sell => {
                let Some(position) = self.positions.get_mut(instrument_id) else {
                    tracing::warn!(instrument = %instrument_id, "Sell fill with no open position");
                    return;
                };
                if size_delta >= position.size {
                    // Full close
                    let proceeds = position.size * fill_price;
                    self.realized_pnl += proceeds - position.entry_value;
                    self.positions.remove(instrument_id);
                } else {
                    let fraction = size_delta / position.size;
                    let cost_released = position.entry_value * fraction;
                    self.realized_pnl += size_delta * fill_price - cost_released;
                    position.size -= size_delta;
                    position.entry_value -= cost_released;
                    position.current_value = position.size * fill_price;
                }
            }
            Direction::Neutral => {}
        }
    }

    /// Update mark-to-market for one instrument
    pub fn mark(&mut self, instrument_id: &str, price: Decimal) {
        if let Some(position) = self.positions.get_mut(instrument_id) {
            position.current_value = position.size * price;
        }
    }
}
