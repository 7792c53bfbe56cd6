//! Move history persistence.
//!
//! Every converted-and-deleted file becomes one row in the
//! `file_move_history` table. The connection is opened once per batch,
//! after all files are processed.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::domain::{AppError, FileMoveRecord, Result};

/// Durable sink for a batch of move records.
pub trait HistoryStore {
    /// Appends every record, in order. An empty batch is a no-op.
    ///
    /// # Errors
    /// Returns a persistence error on connection or write failure.
    fn insert_batch(&mut self, records: &[FileMoveRecord]) -> Result<usize>;
}

/// History store in a SQLite database.
pub struct SqliteHistoryStore {
    connection: String,
}

impl SqliteHistoryStore {
    /// Create a store for the given connection descriptor (database path or `:memory:`).
    #[must_use]
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
        }
    }

    /// Opens the database and makes sure the history table exists.
    fn open(&self) -> Result<Connection> {
        if let Some(parent) = Path::new(&self.connection).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create history store directory", e))?;
        }

        let conn = Connection::open(&self.connection).map_err(AppError::persistence)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS file_move_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_name TEXT NOT NULL,
                file_type TEXT NOT NULL,
                source_path TEXT NOT NULL,
                destination_path TEXT NOT NULL,
                moved_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )
        .map_err(AppError::persistence)?;

        Ok(conn)
    }

    /// All recorded moves, oldest first.
    #[cfg(test)]
    pub(crate) fn load_all(&self) -> Result<Vec<FileMoveRecord>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT file_name, file_type, source_path, destination_path
                 FROM file_move_history ORDER BY id",
            )
            .map_err(AppError::persistence)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(FileMoveRecord {
                    file_name: row.get(0)?,
                    file_type: row.get(1)?,
                    source_path: row.get(2)?,
                    destination_path: row.get(3)?,
                })
            })
            .map_err(AppError::persistence)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::persistence)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn insert_batch(&mut self, records: &[FileMoveRecord]) -> Result<usize> {
        if records.is_empty() {
            tracing::debug!("No moves to record");
            return Ok(0);
        }

        let mut conn = self.open()?;
        let tx = conn.transaction().map_err(AppError::persistence)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO file_move_history
                        (file_name, file_type, source_path, destination_path)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(AppError::persistence)?;

            for record in records {
                stmt.execute(params![
                    &record.file_name,
                    &record.file_type,
                    &record.source_path,
                    &record.destination_path,
                ])
                .map_err(AppError::persistence)?;
            }
        }
        tx.commit().map_err(AppError::persistence)?;

        tracing::info!(rows = records.len(), store = %self.connection, "Move history recorded");
        Ok(records.len())
    }
}
