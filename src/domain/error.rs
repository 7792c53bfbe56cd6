//! Domain-level error types for xlsx-csv-mover.
//!
//! Errors are split in two: [`ConversionError`] describes why a single file
//! could not be converted and moved (never fatal to the batch), while
//! [`AppError`] covers process-level failures such as configuration,
//! validation and history persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Per-file failure kinds. The batch always continues past these.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The file could not be parsed as a spreadsheet.
    #[error("Cannot read {path} as a spreadsheet: {message}")]
    Format {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<calamine::Error>,
    },

    /// The workbook contains no worksheets.
    #[error("No worksheets found in {path}")]
    EmptySheet { path: PathBuf },

    /// The first worksheet has no used cells.
    #[error("No data found in the first worksheet of {path}")]
    NoData { path: PathBuf },

    /// Writing the delimited output failed.
    #[error("Failed to write {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The output was written but the source file could not be removed.
    #[error("Converted but failed to delete source {path}: {source}")]
    Deletion {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    /// Create a format error from a calamine error.
    pub fn format(path: impl Into<PathBuf>, err: calamine::Error) -> Self {
        Self::Format {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a write error from an I/O error.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a write error from a csv error.
    pub fn write(path: impl Into<PathBuf>, err: csv::Error) -> Self {
        let message = err.to_string();
        let source = match err.into_kind() {
            csv::ErrorKind::Io(io) => Some(io),
            _ => None,
        };
        Self::Io {
            path: path.into(),
            message,
            source,
        }
    }

    /// Short machine-friendly name of the failure kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Format { .. } => "format",
            Self::EmptySheet { .. } => "empty-sheet",
            Self::NoData { .. } => "no-data",
            Self::Io { .. } => "io",
            Self::Deletion { .. } => "deletion",
        }
    }
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Source folder missing or destination folder not creatable.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Failed to open or write the history store.
    #[error("History store error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON serialization failed.
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a persistence error from rusqlite error.
    pub fn persistence(err: rusqlite::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a validation error, optionally with the IO cause.
    pub fn validation(message: impl Into<String>, err: Option<std::io::Error>) -> Self {
        Self::Validation {
            message: message.into(),
            source: err,
        }
    }

    /// Create a JSON error.
    pub fn json(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
