//! Application layer - use cases and orchestration.
//!
//! This layer drives the per-file conversion and the batch run,
//! and renders the final summary.

pub mod batch_runner;
pub mod converter;
pub mod formatter;

pub use batch_runner::BatchRunner;
pub use formatter::{format_outcome_table, format_report_json, format_summary, OutputFormat};
