use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use xchg::cli::{ExchangeRequest, WatchRequest};
use xchg::core::currency::Currency;
use xchg::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for xchg::AppCommand {
    fn from(cmd: Commands) -> xchg::AppCommand {
        match cmd {
            Commands::Rates => xchg::AppCommand::Rates,
            Commands::Exchange {
                amount,
                from,
                to,
                into,
            } => xchg::AppCommand::Exchange(ExchangeRequest {
                amount,
                from,
                to,
                into,
            }),
            Commands::Watch { amount, from, to } => {
                xchg::AppCommand::Watch(WatchRequest { amount, from, to })
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current exchange rates
    Rates,
    /// Exchange an amount between two pockets
    Exchange {
        /// Amount with at most two decimals
        amount: String,
        /// Currency to sell (EUR, GBP or USD)
        #[arg(long)]
        from: Option<Currency>,
        /// Currency to buy (EUR, GBP or USD)
        #[arg(long)]
        to: Option<Currency>,
        /// Treat the amount as what should be received
        #[arg(long)]
        into: bool,
    },
    /// Show a live quote that follows rate updates
    Watch {
        /// Amount with at most two decimals
        amount: String,
        #[arg(long)]
        from: Option<Currency>,
        #[arg(long)]
        to: Option<Currency>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => xchg::cli::setup::setup_at_path(path),
            None => xchg::cli::setup::setup(),
        },
        Some(cmd) => xchg::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
