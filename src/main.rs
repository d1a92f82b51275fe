use clap::Parser;
use swarm_trader::cli::{Cli, Commands};
use swarm_trader::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    // Initialize telemetry
    let _guard = swarm_trader::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!(mode = ?config.portfolio.mode, "Starting trading loop");
            args.execute(&config).await?;
        }
        Commands::Check(args) => {
            args.execute(&config).await?;
        }
        Commands::Status => {
            println!("swarm-trader status");
            println!("  Mode: {:?}", config.portfolio.mode);
            println!("  Instruments: {}", config.portfolio.instruments.join(", "));
            println!("  Journal: {}", config.store.journal_path.display());
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Instruments: {}", config.portfolio.instruments.join(", "));
            println!("  Cycle interval: {}s", config.scheduler.cycle_interval_secs);
            println!("  Sources: {}", config.signals.enabled.join(", "));
            println!(
                "  Risk: MaxLoss={}, MaxGain={}, AI confirmation={}",
                config.risk.max_loss, config.risk.max_gain, config.risk.require_ai_confirmation
            );
            println!(
                "  Execution: alloc={}, slippage={}, max attempts={}",
                config.execution.base_allocation_fraction,
                config.execution.max_slippage_pct,
                config.execution.max_attempts
            );
        }
    }

    Ok(())
}
