//! Single-file conversion.
//!
//! Reads a spreadsheet and writes its first sheet as comma-separated text.
//! Failures are logged here and returned as a [`ConversionError`]; nothing
//! escapes as a panic and the batch decides what to do next.

use std::path::Path;

use crate::domain::{ConversionConfig, ConversionError};
use crate::infrastructure::{DelimitedWriter, SpreadsheetReader};

/// Converts one spreadsheet into one delimited file.
#[derive(Debug, Clone)]
pub struct ConversionEngine {
    reader: SpreadsheetReader,
    writer: DelimitedWriter,
}

impl ConversionEngine {
    /// Create an engine from the conversion settings.
    #[must_use]
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            reader: SpreadsheetReader::new(config),
            writer: DelimitedWriter::new(config.quote_fields),
        }
    }

    /// Converts `source` into `destination`, returning the number of rows written.
    ///
    /// The destination is not created when reading fails.
    ///
    /// # Errors
    /// Any read or write failure, already reported to the log.
    pub fn convert(&self, source: &Path, destination: &Path) -> Result<usize, ConversionError> {
        let grid = self.reader.read(source).inspect_err(|e| {
            tracing::warn!("Error converting file {} to CSV: {e}", source.display());
        })?;

        self.writer.write(destination, &grid).inspect_err(|e| {
            tracing::warn!("Error converting file {} to CSV: {e}", source.display());
        })?;

        Ok(grid.len())
    }
}
