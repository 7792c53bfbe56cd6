//! Run configuration.
//!
//! One explicit struct, loaded once and passed by value into the batch runner.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Folder configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FolderConfig {
    /// Folder scanned for `.xls`/`.xlsx` files.
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Folder receiving the `.csv` files. Created if missing.
    #[serde(default)]
    pub destination: Option<PathBuf>,
}

/// History store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// Connection descriptor (SQLite database path). Defaults to the data dir.
    #[serde(default)]
    pub connection: Option<String>,
}

/// Conversion behavior switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Match `.xls`/`.xlsx` exactly instead of ignoring case.
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive_extension_match: bool,

    /// Quote fields RFC-4180 style instead of plain comma joining.
    #[serde(default)]
    pub quote_fields: bool,

    /// Remove the written CSV again when the source cannot be deleted.
    #[serde(default)]
    pub rollback_on_delete_failure: bool,

    /// chrono format for date-only cells.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// chrono format for time-only cells (values below one day).
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// chrono format for cells carrying a time of day.
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            case_sensitive_extension_match: default_case_sensitive(),
            quote_fields: false,
            rollback_on_delete_failure: false,
            date_format: default_date_format(),
            time_format: default_time_format(),
            datetime_format: default_datetime_format(),
        }
    }
}

const fn default_case_sensitive() -> bool {
    true
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_time_format() -> String {
    "%H:%M:%S".to_string()
}

fn default_datetime_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub folders: FolderConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,
}

impl AppConfig {
    /// Config for the given folders with everything else defaulted.
    #[cfg(test)]
    #[must_use]
    pub fn with_folders(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            folders: FolderConfig {
                source: Some(source.into()),
                destination: Some(destination.into()),
            },
            ..Self::default()
        }
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".xlsx-csv-mover")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// History store connection, falling back to a database in the data dir.
    #[must_use]
    pub fn history_connection(&self) -> String {
        self.history.connection.clone().unwrap_or_else(|| {
            Self::default_data_dir()
                .join("history.db")
                .to_string_lossy()
                .into_owned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.folders.source.is_none());
        assert!(config.conversion.case_sensitive_extension_match);
        assert!(!config.conversion.quote_fields);
        assert!(!config.conversion.rollback_on_delete_failure);
        assert_eq!(config.conversion.time_format, "%H:%M:%S");
    }

    #[test]
    fn test_history_connection_fallback() {
        let config = AppConfig::default();
        assert!(config.history_connection().ends_with("history.db"));

        let mut config = AppConfig::with_folders("/in", "/out");
        config.history.connection = Some(":memory:".into());
        assert_eq!(config.history_connection(), ":memory:");
    }
}
