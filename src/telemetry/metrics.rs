//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Signal collection across all sources
    SignalCollection,
    /// AI advisor round trip
    AdvisorCall,
    /// Single order submission
    OrderSubmission,
    /// Full trading cycle
    CycleDuration,
}

impl LatencyMetric {
    fn name(self) -> &'static str {
        match self {
            LatencyMetric::SignalCollection => "swarmtrader_signal_collection_ms",
            LatencyMetric::AdvisorCall => "swarmtrader_advisor_call_ms",
            LatencyMetric::OrderSubmission => "swarmtrader_order_submission_ms",
            LatencyMetric::CycleDuration => "swarmtrader_cycle_duration_ms",
        }
    }
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    ::metrics::histogram!(metric.name()).record(duration.as_millis() as f64);
}

/// Start the Prometheus exporter on the given port
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(port, "Metrics exporter listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        assert!(LatencyMetric::CycleDuration.name().starts_with("swarmtrader_"));
        assert!(LatencyMetric::AdvisorCall.name().starts_with("swarmtrader_"));
    }
}
