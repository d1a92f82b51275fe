//! Telemetry module
//!
//! Structured logging and Prometheus metrics.

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, record_latency, LatencyMetric};

use crate::config::TelemetryConfig;

/// Guard that cleans up telemetry on drop
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level, LogFormat::parse(&config.log_format))?;

    if let Err(e) = init_metrics(config.metrics_port) {
        // A busy metrics port should not stop trading
        tracing::warn!(error = %e, "Continuing without metrics exporter");
    }

    Ok(TelemetryGuard { _priv: () })
}
