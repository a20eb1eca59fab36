//! Download record persistence.
//!
//! Remembers which puzzle dates were already fetched so re-runs only pick
//! up new puzzles. The record is a small JSON document:
//!
//! ```json
//! { "puzzles": ["010124", "020124"] }
//! ```

mod json;

pub use json::JsonDownloadStore;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FileSafeDate;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted shape of the download record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    #[serde(default)]
    pub puzzles: Vec<FileSafeDate>,
}

/// Set of puzzle dates that have been downloaded.
///
/// `record_success` appends blindly; callers check `contains` first.
pub trait DownloadedSet: Send {
    fn contains(&self, id: &FileSafeDate) -> bool;

    /// Record a finished download. Returns only once the record is durable.
    fn record_success(&mut self, id: FileSafeDate) -> Result<(), StorageError>;

    /// Recorded ids in insertion order.
    fn ids(&self) -> &[FileSafeDate];
}

/// In-memory download record, used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDownloadedSet {
    record: DownloadRecord,
}

impl MemoryDownloadedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: impl IntoIterator<Item = FileSafeDate>) -> Self {
        Self {
            record: DownloadRecord {
                puzzles: ids.into_iter().collect(),
            },
        }
    }
}

impl DownloadedSet for MemoryDownloadedSet {
    fn contains(&self, id: &FileSafeDate) -> bool {
        self.record.puzzles.contains(id)
    }

    fn record_success(&mut self, id: FileSafeDate) -> Result<(), StorageError> {
        self.record.puzzles.push(id);
        Ok(())
    }

    fn ids(&self) -> &[FileSafeDate] {
        &self.record.puzzles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_set_contains() {
        let mut set = MemoryDownloadedSet::with_ids([FileSafeDate::from("010124")]);

        assert!(set.contains(&FileSafeDate::from("010124")));
        assert!(!set.contains(&FileSafeDate::from("020124")));

        set.record_success(FileSafeDate::from("020124")).unwrap();
        assert!(set.contains(&FileSafeDate::from("020124")));
        assert_eq!(set.ids().len(), 2);
    }

    #[test]
    fn test_record_default_shape() {
        let json = serde_json::to_string(&DownloadRecord::default()).unwrap();
        assert_eq!(json, r#"{"puzzles":[]}"#);
    }

    #[test]
    fn test_record_missing_field() {
        let record: DownloadRecord = serde_json::from_str("{}").unwrap();
        assert!(record.puzzles.is_empty());
    }
}
