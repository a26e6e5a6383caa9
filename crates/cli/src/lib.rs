pub mod commands;

use approvals_core::config::{AppConfig, LoadOptions, LogFormat};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "approvals",
    about = "Custody approval policy operator CLI",
    long_about = "Evaluate transfer approval requirements, inspect the active policy table, and check configuration readiness.",
    after_help = "Examples:\n  approvals evaluate --amount 50000000 --currency KRW\n  approvals evaluate --amount 0.5 --currency BTC --transaction-type emergency --json\n  approvals tiers\n  approvals doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Select approvers for a proposed transfer")]
    Evaluate {
        #[arg(long, help = "Transfer amount in the given currency, e.g. 0.25")]
        amount: String,
        #[arg(long, help = "Asset or fiat code, e.g. KRW, BTC, USDT")]
        currency: String,
        #[arg(long, help = "Special-case transaction type, e.g. emergency, cross_border")]
        transaction_type: Option<String>,
        #[arg(long, help = "Emit the full result as JSON")]
        json: bool,
    },
    #[command(about = "Print the active policy tiers and extensions")]
    Tiers {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate config, policy data, roster feed and rate coverage")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Evaluate { amount, currency, transaction_type, json } => {
            commands::evaluate::run(&amount, &currency, transaction_type.as_deref(), json)
        }
        Command::Tiers { json } => commands::tiers::run(json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging() {
    use tracing::Level;

    let (level, format) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config.logging.level.parse::<Level>().unwrap_or(Level::WARN), config.logging.format),
        Err(_) => (Level::WARN, LogFormat::Compact),
    };

    let builder =
        tracing_subscriber::fmt().with_writer(std::io::stderr).with_target(false).with_max_level(level);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
