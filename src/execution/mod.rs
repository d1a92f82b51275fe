//! Execution engine module
//!
//! Sizing, slippage control, chunked submission with bounded retries,
//! and idempotent fill application.

mod backoff;
mod engine;
mod types;
mod venue;

pub use backoff::Backoff;
pub use engine::{ExecutionConfig, ExecutionEngine};
pub use types::{ExecutionResult, ExecutionStatus, OrderAck, OrderRequest, SubmitError};
pub use venue::{HttpVenue, OrderVenue, PaperVenue, VenueConfig};
