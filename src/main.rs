use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use valutahub::core::log::init_logging;

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

impl From<Commands> for valutahub::AppCommand {
    fn from(cmd: Commands) -> valutahub::AppCommand {
        match cmd {
            Commands::Setup => valutahub::AppCommand::Setup,
            Commands::Rate { from, to } => valutahub::AppCommand::GetRate { from, to },
            Commands::Update { source } => valutahub::AppCommand::UpdateRates { source },
            Commands::Rates { currency, top } => {
                valutahub::AppCommand::ShowRates { currency, top }
            }
            Commands::Currencies => valutahub::AppCommand::ListCurrencies,
            Commands::StartParser => valutahub::AppCommand::StartParser,
            Commands::ParserStatus => valutahub::AppCommand::ParserStatus,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Resolve the exchange rate for a currency pair
    Rate {
        /// Source currency code
        from: String,
        /// Target currency code
        to: String,
    },
    /// Fetch fresh rates from the configured providers
    Update {
        /// Source selector: all, coingecko or exchangerate
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Show the cached rate snapshot
    Rates {
        /// Only show pairs involving this currency code
        #[arg(long)]
        currency: Option<String>,
        /// Only show the N highest rates
        #[arg(long)]
        top: Option<usize>,
    },
    /// List supported currencies
    Currencies,
    /// Run the background rates parser until interrupted
    StartParser,
    /// Show parser scheduler status and data freshness
    ParserStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(cmd) => valutahub::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
