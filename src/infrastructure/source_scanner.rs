//! Source folder discovery.
//!
//! Lists the spreadsheet files a batch should convert.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::domain::{AppError, Result};

/// Spreadsheet extensions picked up by the scan.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx"];

/// Whether `path` has one of the spreadsheet extensions.
#[must_use]
pub fn is_spreadsheet(path: &Path, case_sensitive: bool) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };

    SPREADSHEET_EXTENSIONS.iter().any(|candidate| {
        if case_sensitive {
            ext == *candidate
        } else {
            ext.eq_ignore_ascii_case(candidate)
        }
    })
}

/// Finds spreadsheet files directly inside `folder`.
///
/// Each file is returned once, sorted by path so runs are reproducible.
/// Directories and files without a stem are skipped.
///
/// # Errors
/// Returns a validation error if the folder cannot be listed.
pub fn find_spreadsheets(folder: &Path, case_sensitive: bool) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder).map_err(|e| {
        AppError::validation(format!("Cannot list source folder {}", folder.display()), Some(e))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.file_stem().is_some_and(|stem| !stem.is_empty()))
        .filter(|path| is_spreadsheet(path, case_sensitive))
        .collect();

    files.sort();

    for file in &files {
        tracing::debug!("Found spreadsheet: {}", file.display());
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_extension_matching() {
        assert!(is_spreadsheet(Path::new("a.xls"), true));
        assert!(is_spreadsheet(Path::new("a.xlsx"), true));
        assert!(!is_spreadsheet(Path::new("a.XLSX"), true));
        assert!(is_spreadsheet(Path::new("a.XLSX"), false));
        assert!(!is_spreadsheet(Path::new("a.xlsm"), false));
        assert!(!is_spreadsheet(Path::new("a.csv"), false));
        assert!(!is_spreadsheet(Path::new("xlsx"), false));
    }

    #[test]
    fn test_find_spreadsheets_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["b.xlsx", "a.xls", "notes.txt", "c.XLS", "report.csv"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("folder.xlsx")).unwrap();

        let files = find_spreadsheets(dir.path(), true).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.xls", "b.xlsx"]);
    }

    #[test]
    fn test_case_insensitive_scan() {
        let dir = tempdir().unwrap();
        for name in ["a.xls", "c.XLS"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = find_spreadsheets(dir.path(), false).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_missing_folder_is_validation_error() {
        let dir = tempdir().unwrap();
        let err = find_spreadsheets(&dir.path().join("missing"), true).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
