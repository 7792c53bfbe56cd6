//! Summary output for a finished batch.
//!
//! Supports a human-readable table and JSON.

use std::fmt::Write as _;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::BatchReport;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Per-file table followed by totals.
    #[default]
    Table,
    /// JSON document for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// Formats the per-file outcome table.
pub fn format_outcome_table(report: &BatchReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["File", "Result", "Detail"]);

    for record in &report.moved {
        table.add_row(vec![
            record.file_name.as_str(),
            "moved",
            record.destination_path.as_str(),
        ]);
    }

    for failure in &report.failures {
        let name = failure
            .source
            .file_name()
            .map_or_else(
                || failure.source.display().to_string(),
                |n| n.to_string_lossy().into_owned(),
            );
        table.add_row(vec![
            name,
            failure.error.kind().to_string(),
            failure.error.to_string(),
        ]);
    }

    table.to_string()
}

/// Formats the closing summary lines.
pub fn format_summary(report: &BatchReport) -> String {
    let mut out = format!(
        "{}\nTotal files converted and moved: {}",
        "Move Process Summary:".bold(),
        report.converted_count().to_string().green()
    );

    if report.failed_count() > 0 {
        let _ = write!(
            out,
            "\nFiles skipped: {}",
            report.failed_count().to_string().yellow()
        );
    }

    if let Some(ref err) = report.history_error {
        let _ = write!(out, "\n{} {err}", "History not recorded:".red());
    }

    out
}

/// Formats the whole report as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_report_json(report: &BatchReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
