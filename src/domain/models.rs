//! Domain models for the conversion batch.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::ConversionError;

/// File type recorded for every conversion produced by this tool.
pub const CSV_FILE_TYPE: &str = "CSV";

/// Rectangular grid of displayed cell text, row-major.
pub type Grid = Vec<Vec<String>>;

/// One successful conversion: written, then source removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMoveRecord {
    /// Base name of the source file, without extension.
    pub file_name: String,
    /// Output type, always [`CSV_FILE_TYPE`] here.
    pub file_type: String,
    /// Directory the source file was read from.
    pub source_path: String,
    /// Full path of the written output file.
    pub destination_path: String,
}

impl FileMoveRecord {
    /// Build a CSV move record.
    #[must_use]
    pub fn csv(file_name: impl Into<String>, source_dir: &Path, destination: &Path) -> Self {
        Self {
            file_name: file_name.into(),
            file_type: CSV_FILE_TYPE.to_string(),
            source_path: source_dir.to_string_lossy().into_owned(),
            destination_path: destination.to_string_lossy().into_owned(),
        }
    }
}

/// A file that did not produce a history record.
#[derive(Debug)]
pub struct FileFailure {
    /// Source spreadsheet path.
    pub source: PathBuf,
    /// Why it failed.
    pub error: ConversionError,
}

/// Everything one run produced, handed to the reporting step.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Candidates found by the scan.
    pub scanned: usize,
    /// Records for converted-and-deleted files, in processing order.
    pub moved: Vec<FileMoveRecord>,
    /// Files skipped because of a per-file failure.
    pub failures: Vec<FileFailure>,
    /// Set when the history store rejected the batch.
    pub history_error: Option<String>,
}

impl BatchReport {
    /// Number of files converted and moved.
    #[must_use]
    pub fn converted_count(&self) -> usize {
        self.moved.len()
    }

    /// Number of files left behind.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// Serializable view of a failure.
#[derive(Debug, Serialize)]
struct FailureView<'a> {
    source: String,
    kind: &'a str,
    message: String,
}

impl Serialize for BatchReport {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let failures: Vec<FailureView<'_>> = self
            .failures
            .iter()
            .map(|f| FailureView {
                source: f.source.display().to_string(),
                kind: f.error.kind(),
                message: f.error.to_string(),
            })
            .collect();

        let mut state = serializer.serialize_struct("BatchReport", 5)?;
        state.serialize_field("scanned", &self.scanned)?;
        state.serialize_field("converted", &self.converted_count())?;
        state.serialize_field("moved", &self.moved)?;
        state.serialize_field("failures", &failures)?;
        state.serialize_field("historyError", &self.history_error)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_record_fields() {
        let record = FileMoveRecord::csv("A", Path::new("/in"), Path::new("/out/A.csv"));
        assert_eq!(record.file_name, "A");
        assert_eq!(record.file_type, "CSV");
        assert_eq!(record.source_path, "/in");
        assert_eq!(record.destination_path, "/out/A.csv");
    }

    #[test]
    fn test_report_serializes_counts() {
        let report = BatchReport {
            scanned: 2,
            moved: vec![FileMoveRecord::csv(
                "A",
                Path::new("/in"),
                Path::new("/out/A.csv"),
            )],
            failures: vec![FileFailure {
                source: PathBuf::from("/in/B.xls"),
                error: ConversionError::NoData {
                    path: PathBuf::from("/in/B.xls"),
                },
            }],
            history_error: None,
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["converted"], 1);
        assert_eq!(json["moved"][0]["fileName"], "A");
        assert_eq!(json["failures"][0]["kind"], "no-data");
    }
}
