//! Shipped example configuration stays loadable

use swarm_trader::config::{Config, TradingMode};

#[test]
fn test_example_config_parses_and_validates() {
    let example = include_str!("../../config.toml.example");
    let config: Config = toml::from_str(example).unwrap();

    assert_eq!(config.portfolio.mode, TradingMode::Paper);
    assert!(config.risk.require_ai_confirmation);
    assert!(config.validate().is_ok());
}

#[test]
fn test_example_config_enables_all_sources() {
    let example = include_str!("../../config.toml.example");
    let config: Config = toml::from_str(example).unwrap();

    for source in ["strategy", "sentiment", "whale", "copybot"] {
        assert!(
            config.signals.enabled.iter().any(|s| s == source),
            "{} missing from example config",
            source
        );
    }
}
