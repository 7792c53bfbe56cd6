//! Spreadsheet reader backed by calamine.
//!
//! Opens `.xls`/`.xlsx` workbooks and renders the first worksheet's used
//! extent as a grid of displayed cell text. For `.xlsx` files the cells'
//! number formats are applied; otherwise numbers use General and dates the
//! configured chrono formats.

use std::fmt::Write as _;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader, Sheets};
use chrono::{NaiveDateTime, Timelike};

use super::cell_styles::CellFormats;
use super::number_format::{self, NumberFormat};
use crate::domain::{ConversionConfig, ConversionError, Grid};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Reads the first sheet of a workbook into a [`Grid`].
#[derive(Debug, Clone)]
pub struct SpreadsheetReader {
    date_format: String,
    time_format: String,
    datetime_format: String,
}

impl SpreadsheetReader {
    /// Create a reader rendering unformatted dates with the configured chrono formats.
    #[must_use]
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            date_format: config.date_format.clone(),
            time_format: config.time_format.clone(),
            datetime_format: config.datetime_format.clone(),
        }
    }

    /// Reads the first worksheet of `path`.
    ///
    /// The file is read into memory up front and its handle closed; the
    /// format is detected from the content, not the extension.
    ///
    /// # Errors
    /// `Format` if the file is not a readable spreadsheet, `EmptySheet` if it
    /// has no worksheets, `NoData` if the first worksheet has no used cells.
    pub fn read(&self, path: &Path) -> Result<Grid, ConversionError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ConversionError::format(path, calamine::Error::Io(e)))?;
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.as_slice()))
            .map_err(|e| ConversionError::format(path, e))?;

        if workbook.sheet_names().is_empty() {
            return Err(ConversionError::EmptySheet {
                path: path.to_path_buf(),
            });
        }

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ConversionError::EmptySheet {
                path: path.to_path_buf(),
            })?
            .map_err(|e| ConversionError::format(path, e))?;

        let formats = if matches!(workbook, Sheets::Xlsx(_)) {
            CellFormats::from_xlsx(&bytes).unwrap_or_else(|e| {
                tracing::debug!(path = %path.display(), "Number formats unavailable: {e}");
                CellFormats::default()
            })
        } else {
            CellFormats::default()
        };

        let grid = self
            .render(&range, &formats)
            .ok_or_else(|| ConversionError::NoData {
                path: path.to_path_buf(),
            })?;

        tracing::debug!(
            path = %path.display(),
            rows = grid.len(),
            columns = grid.first().map_or(0, Vec::len),
            "Worksheet read"
        );

        Ok(grid)
    }

    /// Renders rows and columns from A1 to the bottom-right used cell.
    ///
    /// Returns `None` when the range has no used cells.
    fn render(&self, range: &Range<Data>, formats: &CellFormats) -> Option<Grid> {
        if range.is_empty() {
            return None;
        }
        let (last_row, last_col) = range.end()?;

        let grid = (0..=last_row)
            .map(|row| {
                (0..=last_col)
                    .map(|col| {
                        range.get_value((row, col)).map_or_else(String::new, |cell| {
                            self.display_text(cell, formats.get(row, col), formats.is_1904())
                        })
                    })
                    .collect()
            })
            .collect();

        Some(grid)
    }

    /// Text a spreadsheet application would show for the cell.
    #[allow(clippy::cast_precision_loss)]
    fn display_text(&self, cell: &Data, format: Option<&NumberFormat>, is_1904: bool) -> String {
        match (cell, format) {
            (Data::Empty, _) => String::new(),
            (Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s), _) => s.clone(),
            (Data::Bool(b), _) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            (Data::Error(e), _) => e.to_string(),
            (Data::Int(i), Some(format)) => format.format_number(*i as f64, is_1904),
            (Data::Int(i), None) => i.to_string(),
            (Data::Float(f), Some(format)) => format.format_number(*f, is_1904),
            (Data::Float(f), None) => number_format::general(*f),
            (Data::DateTime(dt), Some(format)) if format.is_date_time() => format.format(dt),
            (Data::DateTime(dt), _) => self.default_date_time(dt),
        }
    }

    /// Dates without a usable format code: `[h]:mm:ss` for durations, the
    /// time format below one day, the date format at midnight and the
    /// datetime format otherwise.
    fn default_date_time(&self, value: &ExcelDateTime) -> String {
        let serial = value.as_f64();
        if value.is_duration() {
            return format_duration(serial);
        }
        let Some(datetime) = value.as_datetime().map(round_to_second) else {
            return number_format::general(serial);
        };

        let pattern = if (0.0..1.0).contains(&serial) {
            &self.time_format
        } else if datetime.num_seconds_from_midnight() == 0 {
            &self.date_format
        } else {
            &self.datetime_format
        };

        let mut text = String::new();
        if write!(text, "{}", datetime.format(pattern)).is_err() {
            tracing::warn!("Invalid date format {pattern:?}");
            return number_format::general(serial);
        }
        text
    }
}

fn round_to_second(datetime: NaiveDateTime) -> NaiveDateTime {
    let carry = datetime.nanosecond() >= 500_000_000;
    let truncated = datetime.with_nanosecond(0).unwrap_or(datetime);
    if carry {
        truncated + chrono::TimeDelta::seconds(1)
    } else {
        truncated
    }
}

/// Formats a fraction of days as `[h]:mm:ss`.
#[allow(clippy::cast_possible_truncation)]
fn format_duration(days: f64) -> String {
    let total = (days * SECONDS_PER_DAY).round() as i64;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
