//! Risk gate types and limits

use super::RiskState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a risk evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Trading may proceed this cycle
    Approve,
    /// Trading is halted this cycle
    Reject,
    /// A limit is breached; consult the AI advisor before deciding
    Escalate,
}

/// How loss/gain limits are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitMode {
    /// Limits are absolute amounts in quote currency
    Absolute,
    /// Limits are percentages of the daily anchor value
    Percent,
}

/// A breached limit, with the offending value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitBreach {
    /// Daily loss limit reached
    MaxLoss(Decimal),
    /// Daily gain limit reached
    MaxGain(Decimal),
    /// Portfolio value below the configured floor
    MinPortfolioValue(Decimal),
}

impl std::fmt::Display for LimitBreach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitBreach::MaxLoss(pnl) => write!(f, "max loss limit breached: daily pnl {}", pnl),
            LimitBreach::MaxGain(pnl) => write!(f, "max gain limit breached: daily pnl {}", pnl),
            LimitBreach::MinPortfolioValue(value) => {
                write!(f, "portfolio value {} below minimum", value)
            }
        }
    }
}

/// Risk management errors
#[derive(Debug, Error)]
pub enum RiskError {
    /// Limits failed validation at startup
    #[error("malformed risk limits: {0}")]
    InvalidLimits(String),
}

/// Configured risk limits
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    /// Maximum daily loss before halting
    pub max_loss: Decimal,
    /// Maximum daily gain before halting
    pub max_gain: Decimal,
    /// Whether limits are absolute or percentage based
    #[serde(default = "default_limit_mode")]
    pub limit_mode: LimitMode,
    /// Halt when the portfolio drops below this value
    #[serde(default)]
    pub min_portfolio_value: Option<Decimal>,
    /// Consult the AI advisor before honoring a breach
    #[serde(default = "default_true")]
    pub require_ai_confirmation: bool,
    /// Minimum seconds between advisor consultations
    #[serde(default = "default_cooldown_secs")]
    pub advisor_cooldown_secs: u64,
    /// Advisor call timeout in seconds
    #[serde(default = "default_advisor_timeout_secs")]
    pub advisor_timeout_secs: u64,
    /// UTC hour at which daily limits reset
    #[serde(default)]
    pub daily_reset_hour_utc: u32,
    /// Instruments that are never traded or liquidated
    #[serde(default)]
    pub excluded_instruments: Vec<String>,
}

fn default_limit_mode() -> LimitMode {
    LimitMode::Absolute
}
fn default_true() -> bool {
    true
}
fn default_cooldown_secs() -> u64 {
    900
}
fn default_advisor_timeout_secs() -> u64 {
    30
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_loss: dec!(25),
            max_gain: dec!(25),
            limit_mode: LimitMode::Absolute,
            min_portfolio_value: None,
            require_ai_confirmation: true,
            advisor_cooldown_secs: 900,
            advisor_timeout_secs: 30,
            daily_reset_hour_utc: 0,
            excluded_instruments: vec![],
        }
    }
}

impl RiskLimits {
    /// Validate limits; malformed limits are fatal at startup
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.max_loss <= Decimal::ZERO {
            return Err(RiskError::InvalidLimits(format!(
                "max_loss must be positive, got {}",
                self.max_loss
            )));
        }
        if self.max_gain <= Decimal::ZERO {
            return Err(RiskError::InvalidLimits(format!(
                "max_gain must be positive, got {}",
                self.max_gain
            )));
        }
        if self.limit_mode == LimitMode::Percent
            && (self.max_loss >= dec!(100) || self.max_gain >= dec!(100))
        {
            return Err(RiskError::InvalidLimits(
                "percentage limits must be below 100".to_string(),
            ));
        }
        if self.daily_reset_hour_utc > 23 {
            return Err(RiskError::InvalidLimits(format!(
                "daily_reset_hour_utc must be 0-23, got {}",
                self.daily_reset_hour_utc
            )));
        }
        Ok(())
    }

    /// Loss limit in quote currency for the current state
    pub fn loss_limit(&self, state: &RiskState) -> Decimal {
        match self.limit_mode {
            LimitMode::Absolute => self.max_loss,
            LimitMode::Percent => state.daily_anchor_value() * self.max_loss / dec!(100),
        }
    }

    /// Gain limit in quote currency for the current state
    pub fn gain_limit(&self, state: &RiskState) -> Decimal {
        match self.limit_mode {
            LimitMode::Absolute => self.max_gain,
            LimitMode::Percent => state.daily_anchor_value() * self.max_gain / dec!(100),
        }
    }

    /// First breached limit, if any
    pub fn breach(&self, state: &RiskState) -> Option<LimitBreach> {
        if let Some(floor) = self.min_portfolio_value {
            if state.portfolio_value < floor {
                return Some(LimitBreach::MinPortfolioValue(state.portfolio_value));
            }
        }
        if state.daily_pnl <= -self.loss_limit(state) {
            return Some(LimitBreach::MaxLoss(state.daily_pnl));
        }
        if state.daily_pnl >= self.gain_limit(state) {
            return Some(LimitBreach::MaxGain(state.daily_pnl));
        }
        None
    }

    /// Whether an instrument is excluded from trading and liquidation
    pub fn is_excluded(&self, instrument_id: &str) -> bool {
        self.excluded_instruments
            .iter()
            .any(|id| id == instrument_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_pnl(daily_pnl: Decimal) -> RiskState {
        let mut state = RiskState::new(dec!(1000));
        // Drive daily_pnl through the book, as the gate would: 4 units
        // bought at 100, then marked to move P&L by the requested amount
        state.book.apply_fill("SOL", crate::signal::Direction::Buy, dec!(400), dec!(100));
        state.book.mark("SOL", dec!(100) + daily_pnl / dec!(4));
        state.recompute(dec!(1000) + daily_pnl);
        state
    }

    #[test]
    fn test_loss_breach_absolute() {
        let limits = RiskLimits {
            max_loss: dec!(100),
            ..Default::default()
        };
        let state = state_with_pnl(dec!(-150));

        assert_eq!(state.daily_pnl, dec!(-150));
        assert!(matches!(
            limits.breach(&state),
            Some(LimitBreach::MaxLoss(_))
        ));
    }

    #[test]
    fn test_gain_breach_absolute() {
        let limits = RiskLimits {
            max_gain: dec!(50),
            ..Default::default()
        };
        let state = state_with_pnl(dec!(60));

        assert!(matches!(
            limits.breach(&state),
            Some(LimitBreach::MaxGain(_))
        ));
    }

    #[test]
    fn test_within_limits_no_breach() {
        let limits = RiskLimits::default();
        let state = state_with_pnl(dec!(-10));

        assert!(limits.breach(&state).is_none());
    }

    #[test]
    fn test_percent_limits_scale_with_anchor() {
        let limits = RiskLimits {
            max_loss: dec!(5),
            max_gain: dec!(5),
            limit_mode: LimitMode::Percent,
            ..Default::default()
        };
        let state = state_with_pnl(dec!(-60));

        // 5% of the 1000 anchor is 50; -60 breaches it
        assert_eq!(limits.loss_limit(&state), dec!(50));
        assert!(matches!(
            limits.breach(&state),
            Some(LimitBreach::MaxLoss(_))
        ));
    }

    #[test]
    fn test_min_portfolio_value_floor() {
        let limits = RiskLimits {
            max_loss: dec!(1000),
            min_portfolio_value: Some(dec!(990)),
            ..Default::default()
        };
        let state = state_with_pnl(dec!(-20));

        assert!(matches!(
            limits.breach(&state),
            Some(LimitBreach::MinPortfolioValue(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_limits() {
        let limits = RiskLimits {
            max_loss: dec!(0),
            ..Default::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_reset_hour() {
        let limits = RiskLimits {
            daily_reset_hour_utc: 24,
            ..Default::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_excluded_instruments() {
        let limits = RiskLimits {
            excluded_instruments: vec!["USDC".to_string()],
            ..Default::default()
        };
        assert!(limits.is_excluded("USDC"));
        assert!(!limits.is_excluded("SOL"));
    }
}
