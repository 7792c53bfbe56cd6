//! Infrastructure layer - external adapters (spreadsheets, files, database).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod cell_styles;
pub mod config;
pub mod delimited_writer;
pub mod history_store;
pub mod number_format;
pub mod source_scanner;
pub mod spreadsheet_reader;

pub use config::{load_config, resolve_folders, ResolvedFolders};
pub use delimited_writer::DelimitedWriter;
pub use history_store::{HistoryStore, SqliteHistoryStore};
pub use source_scanner::find_spreadsheets;
pub use spreadsheet_reader::SpreadsheetReader;
