//! xlsx-csv-mover - batch-convert spreadsheets into CSV files.
//!
//! Every `.xls`/`.xlsx` file in the configured source folder is converted
//! (first worksheet, displayed cell text) into `<name>.csv` in the destination
//! folder. Converted sources are deleted and each move is recorded in a
//! `SQLite` history database.
//!
//!   xlsx-csv-mover                      # run with ~/.xlsx-csv-mover/config.toml
//!   xlsx-csv-mover -c batch.toml -v     # explicit config, info logging
//!   xlsx-csv-mover -f json              # machine-readable summary

mod application;
mod cli;
mod domain;
mod infrastructure;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_outcome_table, format_report_json, format_summary, BatchRunner, OutputFormat,
};
use cli::Cli;
use infrastructure::{load_config, SqliteHistoryStore};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: &Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| domain::AppError::Config { message: e })?;

    let config = load_config(cli.config.as_deref())?;
    let mut store = SqliteHistoryStore::new(config.history_connection());

    let report = BatchRunner::new(config).run(&mut store)?;

    match format {
        OutputFormat::Table => {
            if report.scanned > 0 {
                println!("{}", format_outcome_table(&report));
            }
            println!();
            println!("{}", format_summary(&report));
        }
        OutputFormat::Json => {
            println!(
                "{}",
                format_report_json(&report).map_err(domain::AppError::json)?
            );
        }
    }

    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
