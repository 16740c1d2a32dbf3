//! Per-day snapshot persistence.
//!
//! A snapshot is the full record list for one source on one date. The JSON
//! file store lays them out as:
//!
//! ```text
//! raw/
//! ├── 36kr/
//! │   └── 2025-05-06.json
//! └── github/
//!     ├── 2025-05-05.json
//!     └── 2025-05-06.json
//! ```
//!
//! Each file is a UTF-8 JSON array of records. Writes replace the file
//! wholesale; nothing here ever deletes a snapshot.

use crate::error::StorageError;
use crate::models::Record;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Storage for `(source, date)` snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The stored snapshot, or an empty list when none exists yet.
    async fn read(&self, source: &str, date: NaiveDate) -> Result<Vec<Record>, StorageError>;

    /// Replace the stored snapshot with `records`.
    async fn write(&self, source: &str, date: NaiveDate, records: &[Record]) -> Result<(), StorageError>;
}

/// Snapshots as `{root}/{source}/{YYYY-MM-DD}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, source: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(source)
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    #[instrument(level = "debug", skip_all, fields(%source, %date))]
    async fn read(&self, source: &str, date: NaiveDate) -> Result<Vec<Record>, StorageError> {
        let path = self.path_for(source, date);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No snapshot yet; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(io_error(&path, e)),
        };

        let records: Vec<Record> = serde_json::from_str(&text)
            .map_err(|source| StorageError::Corrupt { path: path.clone(), source })?;
        debug!(path = %path.display(), count = records.len(), "Read snapshot");
        Ok(records)
    }

    #[instrument(level = "debug", skip_all, fields(%source, %date, count = records.len()))]
    async fn write(&self, source: &str, date: NaiveDate, records: &[Record]) -> Result<(), StorageError> {
        let path = self.path_for(source, date);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| io_error(dir, e))?;
        }

        let json = serde_json::to_string_pretty(records).map_err(StorageError::Serialize)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).await.map_err(|e| io_error(&path, e))?;

        info!(path = %path.display(), count = records.len(), "Wrote snapshot");
        Ok(())
    }
}
