//! CLI interface using clap.
//!
//! The tool has no sub-commands: running it performs one full batch.

use std::path::PathBuf;

use clap::Parser;

use crate::application::OutputFormat;

/// xlsx-csv-mover - convert spreadsheets to CSV and record the moves.
#[derive(Parser, Debug)]
#[command(name = "xlsx-csv-mover")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (defaults to ~/.xlsx-csv-mover/config.toml).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Summary format: table or json.
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_runs_defaults() {
        let cli = Cli::try_parse_from(["xlsx-csv-mover"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
        assert_eq!(cli.output_format(), Ok(OutputFormat::Table));
    }

    #[test]
    fn test_flags() {
        let cli =
            Cli::try_parse_from(["xlsx-csv-mover", "-vv", "-c", "run.toml", "-f", "json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("run.toml")));
        assert_eq!(cli.output_format(), Ok(OutputFormat::Json));
    }
}
