//! Signal combination rule
//!
//! Default rule: confidence-weighted average. Direction comes from the
//! sign of the weighted sum of signed strengths; combined strength is
//! the weighted average magnitude. An exact tie resolves to Neutral.

use crate::signal::{Direction, Signal};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Combined direction and strength for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedView {
    /// Combined direction
    pub direction: Direction,
    /// Weighted average magnitude in [0, 1]
    pub strength: Decimal,
}

/// Merge same-instrument signals under per-source weights
///
/// Neutral signals carry no directional view and are ignored. Unlisted
/// sources default to weight 1. Returns `None` when no directional
/// signal remains.
pub fn merge_signals(signals: &[Signal], weights: &HashMap<String, Decimal>) -> Option<MergedView> {
    let mut weighted_sum = Decimal::ZERO;
    let mut magnitude_sum = Decimal::ZERO;
    let mut total_weight = Decimal::ZERO;

    for signal in signals {
        if signal.direction == Direction::Neutral {
            continue;
        }
        let weight = weights
            .get(&signal.source)
            .copied()
            .unwrap_or(Decimal::ONE);
        if weight <= Decimal::ZERO {
            continue;
        }
        weighted_sum += signal.direction.signum() * signal.strength * weight;
        magnitude_sum += signal.strength * weight;
        total_weight += weight;
    }

    if total_weight.is_zero() {
        return None;
    }

    let direction = if weighted_sum > Decimal::ZERO {
        Direction::Buy
    } else if weighted_sum < Decimal::ZERO {
        Direction::Sell
    } else {
        Direction::Neutral
    };

    Some(MergedView {
        direction,
        strength: magnitude_sum / total_weight,
    })
}
