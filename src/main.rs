use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxwatch::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current prices for the configured pairs
    Watchlist,
    /// Display the current price of a pair, e.g. EUR/USD
    Price { pair: String },
    /// Display daily price history of a pair
    History {
        pair: String,
        /// Number of most recent days to show
        #[arg(short, long, default_value_t = 30)]
        days: usize,
    },
}

impl From<Commands> for fxwatch::AppCommand {
    fn from(cmd: Commands) -> fxwatch::AppCommand {
        match cmd {
            Commands::Watchlist => fxwatch::AppCommand::Watchlist,
            Commands::Price { pair } => fxwatch::AppCommand::Price { pair },
            Commands::History { pair, days } => fxwatch::AppCommand::History { pair, days },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxwatch::cli::setup::setup(),
        Some(cmd) => fxwatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
