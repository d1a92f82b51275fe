//! swarm-trader: multi-agent trading orchestrator
//!
//! This library provides the core components for:
//! - Independent signal sources (strategy, sentiment, whale, copy)
//! - Signal aggregation with confidence-weighted merging
//! - A risk gate with AI-assisted override escalation
//! - An execution engine with slippage control and bounded retries
//! - The orchestration loop bracketing every cycle with risk checks
//! - Durable journaling of positions and decisions
//! - Full observability stack

pub mod advisor;
pub mod aggregator;
pub mod cli;
pub mod config;
pub mod execution;
pub mod market;
pub mod orchestrator;
pub mod risk;
pub mod signal;
pub mod store;
pub mod telemetry;
