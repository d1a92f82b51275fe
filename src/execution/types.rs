//! Execution types

use crate::aggregator::Intent;
use crate::signal::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An order handed to the venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Idempotency key: resubmissions of the same chunk reuse it
    pub submission_id: Uuid,
    /// Instrument to trade
    pub instrument_id: String,
    /// Trade direction
    pub direction: Direction,
    /// Order notional in quote currency
    pub notional: Decimal,
    /// Reference price the slippage band is anchored to
    pub reference_price: Decimal,
    /// Maximum acceptable relative deviation from the reference price
    pub max_slippage_pct: Decimal,
}

/// A confirmed fill from the venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    /// Echoed idempotency key
    pub submission_id: Uuid,
    /// Price the order filled at
    pub fill_price: Decimal,
    /// Filled notional in quote currency
    pub fill_notional: Decimal,
    /// Venue transaction identifier
    pub tx_id: String,
}

/// Submission failures, split by retryability
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Transient failure (network, timeout, rate limit): retried with backoff
    #[error("transient submission failure: {0}")]
    Transient(String),
    /// Terminal failure (insufficient balance, rejected order): never retried
    #[error("terminal submission failure: {0}")]
    Terminal(String),
}

impl SubmitError {
    /// Whether the engine should retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, SubmitError::Transient(_))
    }
}

/// Terminal status of one engine invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Full notional filled
    Filled,
    /// Some chunks filled before a failure
    Partial,
    /// Nothing filled
    Failed,
    /// A retry is in flight (interim, never terminal)
    Retrying,
}

/// Record of one execution engine invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The intent that was executed
    pub intent: Intent,
    /// Terminal status
    pub status: ExecutionStatus,
    /// Venue submissions performed, bounded by max_attempts
    pub attempts: u32,
    /// Notional-weighted |fill - reference| / reference across fills
    pub realized_slippage: Decimal,
    /// Failure reason, when not fully filled
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_submit_error_retryability() {
        assert!(SubmitError::Transient("timeout".to_string()).is_transient());
        assert!(!SubmitError::Terminal("insufficient balance".to_string()).is_transient());
    }

    #[test]
    fn test_execution_status_serialize() {
        let json = serde_json::to_string(&ExecutionStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
    }

    #[test]
    fn test_order_request_roundtrip() {
        let request = OrderRequest {
            submission_id: Uuid::new_v4(),
            instrument_id: "SOL".to_string(),
            direction: Direction::Buy,
            notional: dec!(25),
            reference_price: dec!(100),
            max_slippage_pct: dec!(0.01),
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: OrderRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.submission_id, request.submission_id);
        assert_eq!(back.notional, dec!(25));
    }
}
