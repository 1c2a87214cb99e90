// Arbitrage Backtester - CLI
// Single entry point for ingestion, refinement and backtesting

use arb_backtester::{ArbError, CancelToken, Config, ConfigError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn, Level};

// Load command implementations from cli directory
#[path = "../cli/commands.rs"]
mod commands;

#[derive(Parser)]
#[command(name = "arb-bot")]
#[command(version = "0.2.0")]
#[command(about = "Cross-exchange arbitrage analytics and backtesting", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example config and create the data directories
    Init,

    /// Aggregate recorded order books into a snapshot series
    Aggregate {
        /// Exchange id, as configured under [exchanges]
        #[arg(short, long)]
        exchange: String,

        /// Traded symbol (e.g., BTC/EUR)
        #[arg(short, long)]
        symbol: String,

        /// JSON-lines file of recorded books
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Align snapshot series and write refined profitability datasets
    Refine,

    /// Backtest every refined dataset
    Backtest {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refine, then backtest
    Run,

    /// Run pre-flight checks only
    Validate,

    /// Backtest one refined dataset and print its statistics
    Summary {
        /// Refined dataset (BASE_QUOTE_exchangeA_exchangeB.csv)
        file: PathBuf,
    },
}

fn init_logging(verbose: bool, configured: Option<&str>) {
    let level = if verbose {
        Level::DEBUG
    } else {
        configured
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Init creates the config, everything else needs it
    if let Commands::Init = cli.command {
        init_logging(cli.verbose, None);
        init_workspace(&cli.config)?;
        return Ok(());
    }

    let loaded = Config::load_or_error(&cli.config);
    init_logging(cli.verbose, loaded.as_ref().ok().map(|c| c.logging.level.as_str()));

    info!("🚀 Arbitrage Backtester v0.2.0");
    info!("📁 Config: {}", cli.config);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => exit_with_config_error(e),
    };

    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️  Interrupt received, stopping after the current records...");
            signal_token.cancel();
        }
    });

    if let Err(e) = execute(cli.command, &config, &cancel).await {
        error!("❌ {} error", e.category());
        error!("{}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}

async fn execute(command: Commands, config: &Config, cancel: &CancelToken) -> Result<(), ArbError> {
    match command {
        Commands::Init => {}
        Commands::Aggregate { exchange, symbol, input } => {
            commands::aggregate(&exchange, &symbol, &input, config, cancel).await?;
        }
        Commands::Refine => {
            commands::refine(config, cancel).await?;
        }
        Commands::Backtest { json } => {
            commands::backtest(config, json, cancel).await?;
        }
        Commands::Run => {
            commands::run(config, cancel).await?;
        }
        Commands::Validate => {
            commands::validate(config)?;
        }
        Commands::Summary { file } => {
            commands::summary(&file, config)?;
        }
    }

    if cancel.is_cancelled() {
        warn!("⚠️  Run was interrupted; cancelled pipelines were not reported");
    }
    Ok(())
}

/// Log a configuration error with a helpful hint and exit
fn exit_with_config_error(e: ConfigError) -> ! {
    error!("❌ Configuration Error");
    error!("{}", e);

    if matches!(e, ConfigError::FileNotFound(_)) {
        error!("");
        error!("💡 Quick fix:");
        error!("   1. Run: arb-bot init");
        error!("   2. Edit config.toml with your exchange fees and conversion rates");
        error!("   3. Try again");
    }

    std::process::exit(1);
}

fn init_workspace(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;

    info!("🔧 Initializing workspace...");

    // Create default config if it doesn't exist
    if !std::path::Path::new(config_path).exists() {
        let default_config = include_str!("../../config.toml.example");
        fs::write(config_path, default_config)?;
        info!("📝 Created {}", config_path);
    } else {
        warn!("⚠️  {} already exists, skipping", config_path);
    }

    let config = Config::from_file(config_path)?;
    fs::create_dir_all(&config.data.raw_dir)?;
    fs::create_dir_all(&config.data.refined_dir)?;

    info!("✅ Workspace initialized successfully!");
    info!("💡 Next steps:");
    info!("   1. Edit {} with your exchange fees and conversion rates", config_path);
    info!("   2. Run: arb-bot aggregate --exchange kraken --symbol BTC/EUR --input books.jsonl");
    info!("   3. Run: arb-bot run");

    Ok(())
}
