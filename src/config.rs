//! Configuration types for swarm-trader

use crate::advisor::AdvisorConfig;
use crate::aggregator::AggregatorConfig;
use crate::execution::{ExecutionConfig, VenueConfig};
use crate::market::MarketDataConfig;
use crate::orchestrator::SchedulerConfig;
use crate::risk::RiskLimits;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub signals: SignalsConfig,
    pub risk: RiskLimits,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub market: MarketDataConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub telemetry: TelemetryConfig,
}

/// Portfolio and execution mode
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    /// Instruments the system may trade
    pub instruments: Vec<String>,
    /// Paper or live execution
    #[serde(default = "default_mode")]
    pub mode: TradingMode,
    /// Starting portfolio value for paper mode
    #[serde(default = "default_initial_value")]
    pub initial_value: rust_decimal::Decimal,
}

fn default_mode() -> TradingMode {
    TradingMode::Paper
}
fn default_initial_value() -> rust_decimal::Decimal {
    rust_decimal_macros::dec!(1000)
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
}

/// Which signal sources are enabled
#[derive(Debug, Clone, Deserialize)]
pub struct SignalsConfig {
    /// Enabled sources by name
    #[serde(default = "default_enabled_sources")]
    pub enabled: Vec<String>,
}

fn default_enabled_sources() -> Vec<String> {
    vec!["strategy".to_string()]
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_sources(),
        }
    }
}

/// Durable state paths
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// State snapshot journal
    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,
    /// Risk decision audit log
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("./data/journal.jsonl")
}
fn default_audit_path() -> PathBuf {
    PathBuf::from("./data/audit.jsonl")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_path: default_journal_path(),
            audit_path: default_audit_path(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-cutting constraints; failures are fatal at startup
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.portfolio.instruments.is_empty() {
            anyhow::bail!("portfolio.instruments must not be empty");
        }
        self.risk.validate()?;
        self.execution.validate()?;
        if self.scheduler.cycle_interval_secs == 0 {
            anyhow::bail!("scheduler.cycle_interval_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const EXAMPLE: &str = r#"
        [portfolio]
        instruments = ["SOL", "FART"]
        mode = "paper"
        initial_value = 1000.0

        [scheduler]
        cycle_interval_secs = 900

        [signals]
        enabled = ["strategy", "sentiment"]

        [risk]
        max_loss = 25.0
        max_gain = 25.0
        limit_mode = "absolute"
        require_ai_confirmation = true
        excluded_instruments = ["USDC"]

        [execution]
        base_allocation_fraction = 0.25
        max_order_notional = 3.0

        [telemetry]
        metrics_port = 9090
        log_level = "info"
    "#;

    #[test]
    fn test_config_deserialize() {
        let config: Config = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.portfolio.instruments.len(), 2);
        assert_eq!(config.portfolio.mode, TradingMode::Paper);
        assert_eq!(config.risk.max_loss, dec!(25));
        assert_eq!(config.signals.enabled, vec!["strategy", "sentiment"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.scheduler.cycle_interval_secs, 900);
        assert_eq!(config.execution.max_attempts, 5);
        assert_eq!(config.aggregator.min_intent_strength, dec!(0.1));
        assert_eq!(config.store.journal_path, PathBuf::from("./data/journal.jsonl"));
    }

    #[test]
    fn test_empty_instruments_rejected() {
        let toml = EXAMPLE.replace("instruments = [\"SOL\", \"FART\"]", "instruments = []");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_limits_rejected() {
        let toml = EXAMPLE.replace("max_loss = 25.0", "max_loss = -5.0");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_live_mode_deserialize() {
        let toml = EXAMPLE.replace("mode = \"paper\"", "mode = \"live\"");
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.portfolio.mode, TradingMode::Live);
    }
}
