//! Batch orchestration.
//!
//! Validates the folders, converts every spreadsheet found in the source
//! folder, deletes converted sources, and hands the accumulated move records
//! to the history store in a single call.

use std::fs;
use std::path::Path;

use crate::domain::{
    AppConfig, AppError, BatchReport, ConversionError, FileFailure, FileMoveRecord, Result,
};
use crate::infrastructure::{find_spreadsheets, resolve_folders, HistoryStore, ResolvedFolders};

use super::converter::ConversionEngine;

/// Runs one conversion batch.
pub struct BatchRunner {
    config: AppConfig,
    engine: ConversionEngine,
}

impl BatchRunner {
    /// Create a runner owning its configuration.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let engine = ConversionEngine::new(&config.conversion);
        Self { config, engine }
    }

    /// Runs the batch to completion.
    ///
    /// Per-file failures and history store failures are recorded in the
    /// report; only configuration and folder validation failures abort.
    ///
    /// # Errors
    /// `Config` if a folder is not configured, `Validation` if the source
    /// folder is missing or the destination folder cannot be created.
    pub fn run<S: HistoryStore + ?Sized>(self, store: &mut S) -> Result<BatchReport> {
        let folders = resolve_folders(&self.config)?;
        validate_folders(&folders)?;

        let candidates = find_spreadsheets(
            &folders.source,
            self.config.conversion.case_sensitive_extension_match,
        )?;
        tracing::info!(
            source = %folders.source.display(),
            files = candidates.len(),
            "Scanned source folder"
        );

        let mut report = BatchReport {
            scanned: candidates.len(),
            ..BatchReport::default()
        };

        for source in candidates {
            match self.process_file(&source, &folders) {
                Ok(record) => {
                    tracing::info!(
                        "Converted and moved {} to {}",
                        source.display(),
                        record.destination_path
                    );
                    report.moved.push(record);
                }
                Err(error) => report.failures.push(FileFailure { source, error }),
            }
        }

        if let Err(e) = store.insert_batch(&report.moved) {
            tracing::error!("Failed to record move history: {e}");
            report.history_error = Some(e.to_string());
        }

        tracing::info!(
            converted = report.converted_count(),
            failed = report.failed_count(),
            "Batch finished"
        );

        Ok(report)
    }

    /// Converts one file, deletes its source and builds the move record.
    fn process_file(
        &self,
        source: &Path,
        folders: &ResolvedFolders,
    ) -> std::result::Result<FileMoveRecord, ConversionError> {
        let file_name = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = folders.destination.join(format!("{file_name}.csv"));

        self.engine.convert(source, &destination)?;
        remove_source(
            source,
            &destination,
            self.config.conversion.rollback_on_delete_failure,
        )?;

        Ok(FileMoveRecord::csv(file_name, &folders.source, &destination))
    }
}

/// Source must exist; destination is created when absent.
fn validate_folders(folders: &ResolvedFolders) -> Result<()> {
    if !folders.source.is_dir() {
        let message = format!("Source folder {} does not exist", folders.source.display());
        tracing::error!("{message}");
        return Err(AppError::validation(message, None));
    }

    if !folders.destination.is_dir() {
        fs::create_dir_all(&folders.destination).map_err(|e| {
            let message = format!("Error creating folder {}", folders.destination.display());
            tracing::error!("{message}: {e}");
            AppError::validation(message, Some(e))
        })?;
        tracing::info!("Created folder: {}", folders.destination.display());
    }

    Ok(())
}

/// Deletes the converted source.
///
/// On failure the written destination stays unless `rollback` is set.
fn remove_source(
    source: &Path,
    destination: &Path,
    rollback: bool,
) -> std::result::Result<(), ConversionError> {
    let Err(err) = fs::remove_file(source) else {
        return Ok(());
    };

    tracing::warn!("Error moving file {}: {err}", source.display());

    if rollback {
        match fs::remove_file(destination) {
            Ok(()) => tracing::info!(
                "Removed {} after failed source deletion",
                destination.display()
            ),
            Err(e) => tracing::warn!("Failed to roll back {}: {e}", destination.display()),
        }
    }

    Err(ConversionError::Deletion {
        path: source.to_path_buf(),
        source: err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteHistoryStore;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    /// Store double remembering every batch it was handed.
    #[derive(Default)]
    struct RecordingStore {
        batches: Vec<Vec<FileMoveRecord>>,
        fail: bool,
    }

    impl HistoryStore for RecordingStore {
        fn insert_batch(&mut self, records: &[FileMoveRecord]) -> Result<usize> {
            self.batches.push(records.to_vec());
            if self.fail {
                return Err(AppError::Persistence {
                    message: "store offline".into(),
                    source: None,
                });
            }
            Ok(records.len())
        }
    }

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        destination: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let source = dir.path().join("in");
            let destination = dir.path().join("out");
            fs::create_dir(&source).unwrap();
            Self {
                _dir: dir,
                source,
                destination,
            }
        }

        fn config(&self) -> AppConfig {
            AppConfig::with_folders(&self.source, &self.destination)
        }

        fn workbook(&self, name: &str, rows: &[&[&str]]) -> PathBuf {
            let path = self.source.join(name);
            let mut workbook = Workbook::new();
            let worksheet = workbook.add_worksheet();
            for (r, row) in rows.iter().enumerate() {
                for (c, text) in row.iter().enumerate() {
                    worksheet
                        .write_string(u32::try_from(r).unwrap(), u16::try_from(c).unwrap(), *text)
                        .unwrap();
                }
            }
            workbook.save(&path).unwrap();
            path
        }
    }

    #[test]
    fn test_mixed_batch_converts_good_and_skips_broken() {
        let fx = Fixture::new();
        let a = fx.workbook("A.xlsx", &[&["a", "b"], &["1", "2"]]);
        let b = fx.source.join("B.xls");
        fs::write(&b, b"not a workbook").unwrap();

        let mut store = RecordingStore::default();
        let report = BatchRunner::new(fx.config()).run(&mut store).unwrap();

        let csv = fx.destination.join("A.csv");
        assert_eq!(fs::read_to_string(&csv).unwrap(), "a,b\n1,2\n");
        assert!(!a.exists());
        assert!(b.exists());
        assert!(!fx.destination.join("B.csv").exists());

        assert_eq!(report.scanned, 2);
        assert_eq!(report.converted_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(matches!(
            report.failures[0].error,
            ConversionError::Format { .. }
        ));

        let expected = FileMoveRecord::csv("A", &fx.source, &csv);
        assert_eq!(report.moved, vec![expected.clone()]);
        assert_eq!(store.batches, vec![vec![expected]]);
    }

    #[test]
    fn test_destination_folder_is_created() {
        let fx = Fixture::new();
        fx.workbook("A.xlsx", &[&["x"]]);
        assert!(!fx.destination.exists());

        let mut store = RecordingStore::default();
        let report = BatchRunner::new(fx.config()).run(&mut store).unwrap();

        assert!(fx.destination.is_dir());
        assert_eq!(report.converted_count(), 1);
    }

    #[test]
    fn test_missing_source_aborts_before_anything() {
        let fx = Fixture::new();
        let config = AppConfig::with_folders(fx.source.join("missing"), &fx.destination);

        let mut store = RecordingStore::default();
        let err = BatchRunner::new(config).run(&mut store).unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert!(!fx.destination.exists());
        assert!(store.batches.is_empty());
    }

    #[test]
    fn test_unconfigured_folders_abort() {
        let mut store = RecordingStore::default();
        let err = BatchRunner::new(AppConfig::default())
            .run(&mut store)
            .unwrap_err();

        assert!(matches!(err, AppError::Config { .. }));
        assert!(store.batches.is_empty());
    }

    #[test]
    fn test_empty_sheet_is_skipped_and_kept() {
        let fx = Fixture::new();
        let empty = fx.workbook("empty.xlsx", &[]);

        let mut store = RecordingStore::default();
        let report = BatchRunner::new(fx.config()).run(&mut store).unwrap();

        assert!(empty.exists());
        assert!(!fx.destination.join("empty.csv").exists());
        assert_eq!(report.converted_count(), 0);
        assert!(matches!(
            report.failures[0].error,
            ConversionError::NoData { .. }
        ));
    }

    #[test]
    fn test_empty_source_twice_writes_nothing() {
        let fx = Fixture::new();
        let db_path = fx.destination.with_file_name("history.db");
        let mut store = SqliteHistoryStore::new(db_path.to_string_lossy());

        for _ in 0..2 {
            let report = BatchRunner::new(fx.config()).run(&mut store).unwrap();
            assert_eq!(report.scanned, 0);
            assert_eq!(report.converted_count(), 0);
        }

        assert!(!db_path.exists());
    }

    #[test]
    fn test_history_failure_is_not_fatal() {
        let fx = Fixture::new();
        let a = fx.workbook("A.xlsx", &[&["x"]]);

        let mut store = RecordingStore {
            fail: true,
            ..RecordingStore::default()
        };
        let report = BatchRunner::new(fx.config()).run(&mut store).unwrap();

        assert!(!a.exists());
        assert!(fx.destination.join("A.csv").exists());
        assert_eq!(report.converted_count(), 1);
        assert!(report
            .history_error
            .as_deref()
            .is_some_and(|msg| msg.contains("store offline")));
    }

    #[test]
    fn test_records_persisted_to_sqlite() {
        let fx = Fixture::new();
        fx.workbook("A.xlsx", &[&["a"]]);
        fx.workbook("B.xlsx", &[&["b"]]);
        let db_path = fx.destination.with_file_name("history.db");
        let mut store = SqliteHistoryStore::new(db_path.to_string_lossy());

        let report = BatchRunner::new(fx.config()).run(&mut store).unwrap();

        let stored = store.load_all().unwrap();
        assert_eq!(stored, report.moved);
        let names: Vec<_> = stored.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        for record in &stored {
            assert!(Path::new(&record.destination_path).exists());
            assert!(!fx
                .source
                .join(format!("{}.xlsx", record.file_name))
                .exists());
        }
    }

    #[test]
    fn test_case_insensitive_extensions_when_configured() {
        let fx = Fixture::new();
        fx.workbook("UPPER.XLSX", &[&["x"]]);

        let mut store = RecordingStore::default();
        let report = BatchRunner::new(fx.config()).run(&mut store).unwrap();
        assert_eq!(report.scanned, 0);

        let mut config = fx.config();
        config.conversion.case_sensitive_extension_match = false;
        let report = BatchRunner::new(config).run(&mut store).unwrap();
        assert_eq!(report.converted_count(), 1);
        assert!(fx.destination.join("UPPER.csv").exists());
    }

    #[test]
    fn test_existing_output_is_overwritten() {
        let fx = Fixture::new();
        fx.workbook("A.xlsx", &[&["fresh"]]);
        fs::create_dir(&fx.destination).unwrap();
        fs::write(fx.destination.join("A.csv"), "stale\nstale\n").unwrap();

        let mut store = RecordingStore::default();
        BatchRunner::new(fx.config()).run(&mut store).unwrap();

        assert_eq!(
            fs::read_to_string(fx.destination.join("A.csv")).unwrap(),
            "fresh\n"
        );
    }

    #[test]
    fn test_failed_delete_keeps_output_by_default() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("A.csv");
        fs::write(&destination, "a\n").unwrap();

        let err = remove_source(&dir.path().join("gone.xlsx"), &destination, false).unwrap_err();

        assert!(matches!(err, ConversionError::Deletion { .. }));
        assert!(destination.exists());
    }

    #[test]
    fn test_failed_delete_rolls_back_when_configured() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("A.csv");
        fs::write(&destination, "a\n").unwrap();

        let err = remove_source(&dir.path().join("gone.xlsx"), &destination, true).unwrap_err();

        assert!(matches!(err, ConversionError::Deletion { .. }));
        assert!(!destination.exists());
    }
}
