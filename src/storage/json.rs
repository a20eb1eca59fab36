//! JSON file backed download record.
//!
//! The whole document is rewritten on every update: serialised to a
//! sibling temp file, flushed, then renamed over the original.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{DownloadRecord, DownloadedSet, StorageError};
use crate::models::FileSafeDate;

/// Download record persisted as a JSON document.
#[derive(Debug)]
pub struct JsonDownloadStore {
    path: PathBuf,
    record: DownloadRecord,
}

impl JsonDownloadStore {
    /// Load the record at `path`, creating an empty one if it does not exist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if !path.exists() {
            let store = Self {
                path,
                record: DownloadRecord::default(),
            };
            store.flush()?;
            info!("Created download record at {:?}", store.path);
            return Ok(store);
        }

        let contents = fs::read_to_string(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        let record: DownloadRecord = serde_json::from_str(&contents)?;

        debug!(
            "Loaded {} recorded puzzles from {:?}",
            record.puzzles.len(),
            path
        );
        Ok(Self { path, record })
    }

    /// Read the record at `path` without creating it.
    pub fn peek(path: &Path) -> Result<DownloadRecord, StorageError> {
        if !path.exists() {
            return Ok(DownloadRecord::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let file = File::create(&tmp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.record)?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        writer.get_ref().sync_all().map_err(io_err)?;

        fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl DownloadedSet for JsonDownloadStore {
    fn contains(&self, id: &FileSafeDate) -> bool {
        self.record.puzzles.contains(id)
    }

    fn record_success(&mut self, id: FileSafeDate) -> Result<(), StorageError> {
        self.record.puzzles.push(id);
        self.flush()
    }

    fn ids(&self) -> &[FileSafeDate] {
        &self.record.puzzles
    }
}
