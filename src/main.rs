use anyhow::Result;
use cbrates::core::log::init_logging;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;

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
    /// Display exchange rates for a day
    Rates {
        /// Day to show (YYYY-MM-DD), today when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Convert an amount between currencies
    Convert {
        amount: Decimal,
        from: String,
        to: String,
        /// Day whose rates to use (YYYY-MM-DD), today when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

impl From<Commands> for cbrates::AppCommand {
    fn from(cmd: Commands) -> cbrates::AppCommand {
        match cmd {
            Commands::Rates { date } => cbrates::AppCommand::Rates { date },
            Commands::Convert {
                amount,
                from,
                to,
                date,
            } => cbrates::AppCommand::Convert {
                amount,
                from,
                to,
                date,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => cbrates::cli::setup::setup(),
        Some(cmd) => cbrates::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
