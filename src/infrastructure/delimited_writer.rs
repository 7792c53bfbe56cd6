//! Comma-delimited output.
//!
//! By default fields are joined with a bare comma, one newline-terminated
//! line per row, without quoting. Cell text containing commas, quotes or
//! newlines therefore produces ambiguous output unless `quote_fields` is on,
//! in which case RFC 4180 quoting is applied where needed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};

use crate::domain::ConversionError;

/// Writes grids of strings as comma-separated text files.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedWriter {
    quote_fields: bool,
}

impl DelimitedWriter {
    /// Create a writer; `quote_fields` enables RFC 4180 quoting.
    #[must_use]
    pub const fn new(quote_fields: bool) -> Self {
        Self { quote_fields }
    }

    /// Creates or truncates `path` and writes every row in order.
    ///
    /// A failure partway leaves whatever was written on disk.
    ///
    /// # Errors
    /// Returns `ConversionError::Io` if the file cannot be created or written.
    pub fn write<R: AsRef<[String]>>(
        &self,
        path: &Path,
        rows: &[R],
    ) -> Result<(), ConversionError> {
        if self.quote_fields {
            write_quoted(path, rows)?;
        } else {
            write_plain(path, rows).map_err(|e| ConversionError::io(path, e))?;
        }

        tracing::debug!(path = %path.display(), rows = rows.len(), "Delimited file written");
        Ok(())
    }
}

/// Each row is its fields joined with `,`; nothing is escaped.
fn write_plain<R: AsRef<[String]>>(path: &Path, rows: &[R]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        writer.write_all(row.as_ref().join(",").as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn write_quoted<R: AsRef<[String]>>(path: &Path, rows: &[R]) -> Result<(), ConversionError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ConversionError::write(path, e))?;

    for row in rows {
        writer
            .write_record(row.as_ref())
            .map_err(|e| ConversionError::write(path, e))?;
    }

    writer.flush().map_err(|e| ConversionError::io(path, e))
}
