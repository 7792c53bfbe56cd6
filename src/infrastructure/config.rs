//! Configuration file management.
//!
//! Handles loading the TOML configuration and writing a starter template.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# xlsx-csv-mover configuration
# Auto-generated - fill in the folders before the first run

[folders]
# Folder scanned for .xls/.xlsx files (must exist)
# source = "/data/inbox"

# Folder receiving the .csv files (created if missing)
# destination = "/data/outbox"

[history]
# SQLite database recording every move (defaults to ~/.xlsx-csv-mover/history.db)
# connection = "/data/history.db"

[conversion]
# Match extensions exactly; set false to also accept .XLSX and friends
case_sensitive_extension_match = true

# Quote fields containing commas, quotes or newlines (RFC 4180)
quote_fields = false

# Remove the written .csv again when the source file cannot be deleted
rollback_on_delete_failure = false

# chrono formats for date cells without a workbook number format
date_format = "%Y-%m-%d"
time_format = "%H:%M:%S"
datetime_format = "%Y-%m-%d %H:%M:%S"
"#;

/// Source and destination folders once both are known to be configured.
#[derive(Debug, Clone)]
pub struct ResolvedFolders {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Load configuration from an explicit path or the default location.
///
/// When no path is given and the default file is missing, a template is
/// written and a configuration error returned.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config_from_file(path);
    }

    let config_path = AppConfig::default_config_path();
    if config_path.exists() {
        load_config_from_file(&config_path)
    } else {
        ensure_config_exists(&config_path)?;
        Err(AppError::Config {
            message: format!(
                "No configuration found. A template was written to {}; set the source and destination folders",
                config_path.display()
            ),
        })
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file {}: {e}", path.display()),
    })?;

    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Create the default configuration file if it doesn't exist.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(())
}

/// Require both folders to be set.
///
/// # Errors
/// Returns a configuration error naming the missing key.
pub fn resolve_folders(config: &AppConfig) -> Result<ResolvedFolders> {
    let source = config.folders.source.clone().ok_or_else(|| AppError::Config {
        message: "folders.source is not set".into(),
    })?;
    let destination = config
        .folders
        .destination
        .clone()
        .ok_or_else(|| AppError::Config {
            message: "folders.destination is not set".into(),
        })?;

    Ok(ResolvedFolders {
        source,
        destination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.folders.source.is_none());
        assert!(config.conversion.case_sensitive_extension_match);
        assert_eq!(config.conversion.date_format, "%Y-%m-%d");
        assert_eq!(config.conversion.time_format, "%H:%M:%S");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[folders]
source = "/data/in"
destination = "/data/out"

[history]
connection = "/data/history.db"

[conversion]
quote_fields = true
time_format = "%H:%M"
"#,
        )
        .unwrap();

        let config = load_config(Some(&config_path)).unwrap();
        let folders = resolve_folders(&config).unwrap();

        assert_eq!(folders.source, PathBuf::from("/data/in"));
        assert_eq!(folders.destination, PathBuf::from("/data/out"));
        assert_eq!(config.history_connection(), "/data/history.db");
        assert!(config.conversion.quote_fields);
        assert_eq!(config.conversion.time_format, "%H:%M");
        assert!(config.conversion.case_sensitive_extension_match);
    }

    #[test]
    fn test_missing_folder_is_config_error() {
        let config: AppConfig = toml::from_str("[folders]\nsource = \"/in\"\n").unwrap();
        let err = resolve_folders(&config).unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
        assert!(err.to_string().contains("folders.destination"));
    }

    #[test]
    fn test_ensure_config_writes_template_once() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");

        ensure_config_exists(&config_path).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG);

        fs::write(&config_path, "# edited").unwrap();
        ensure_config_exists(&config_path).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "# edited");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[folders\nsource = ").unwrap();

        assert!(matches!(
            load_config_from_file(&config_path),
            Err(AppError::Config { .. })
        ));
    }
}
