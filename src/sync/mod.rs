//! Sync orchestrator.
//!
//! One pass over the listing page:
//! 1. Fetch the listing page
//! 2. Extract puzzle entries with the configured strategy
//! 3. Skip dates already in the download record
//! 4. Download the rest, recording each success before logging it
//!
//! A failed listing fetch, an extraction error or a failed record write
//! ends the pass. A failed puzzle download only affects that puzzle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::date::{parse_display_date, to_display_string, to_file_safe_id};
use crate::extract::PageExtractor;
use crate::fetch::PuzzleSource;
use crate::models::{FileSafeDate, PuzzleEntry};
use crate::storage::DownloadedSet;

/// Errors that abort a sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Listing fetch failed: {0}")]
    Fetch(#[from] crate::fetch::FetchError),

    #[error("Listing extraction failed: {0}")]
    Extract(#[from] crate::extract::ExtractError),

    #[error("Download record write failed: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Listing page; relative puzzle links resolve against it
    pub listing_url: Url,

    /// Directory receiving `{DDMMYY}.pdf` files
    pub download_dir: PathBuf,

    /// Interval for periodic syncs
    pub interval: Duration,

    /// Extract and report, but neither download nor record
    pub dry_run: bool,
}

/// A puzzle that could not be fetched during a pass.
#[derive(Debug, Clone)]
pub struct EntryFailure {
    pub raw_date_text: String,
    pub reason: String,
}

/// Result of a sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub entries_found: usize,

    /// Downloaded ids, in listing order (ids that would be downloaded on a dry run)
    pub downloaded: Vec<FileSafeDate>,

    pub skipped: usize,
    pub failures: Vec<EntryFailure>,
    pub duration: Duration,
}

/// Sync orchestrator.
pub struct PuzzleSync {
    config: SyncConfig,
    source: Arc<dyn PuzzleSource>,
    extractor: Box<dyn PageExtractor>,
}

impl PuzzleSync {
    /// Create a new sync orchestrator.
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn PuzzleSource>,
        extractor: Box<dyn PageExtractor>,
    ) -> Self {
        Self {
            config,
            source,
            extractor,
        }
    }

    /// Local path for a puzzle id.
    pub fn output_path(&self, id: &FileSafeDate) -> PathBuf {
        self.config.download_dir.join(id.pdf_filename())
    }

    /// Run a single sync pass against `store`.
    pub async fn sync_once(&self, store: &mut dyn DownloadedSet) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        info!("Starting sync from {}", self.config.listing_url);

        let page = self.source.fetch_text(&self.config.listing_url).await?;
        let entries = self.extractor.extract(&page)?;
        info!(
            "Found {} puzzles using {} extraction",
            entries.len(),
            self.extractor.name()
        );

        let mut report = SyncReport {
            entries_found: entries.len(),
            ..Default::default()
        };

        for entry in &entries {
            self.process_entry(entry, store, &mut report).await?;
        }

        report.duration = start.elapsed();
        info!(
            "Sync completed: {} downloaded, {} already present, {} failed in {:?}",
            report.downloaded.len(),
            report.skipped,
            report.failures.len(),
            report.duration
        );

        Ok(report)
    }

    /// Handle one entry. Only a record write failure is returned as an error.
    async fn process_entry(
        &self,
        entry: &PuzzleEntry,
        store: &mut dyn DownloadedSet,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let date = match parse_display_date(&entry.raw_date_text) {
            Ok(date) => date,
            Err(e) => {
                warn!("Skipping {}: {}", entry.download_url, e);
                report.failures.push(EntryFailure {
                    raw_date_text: entry.raw_date_text.clone(),
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        let id = to_file_safe_id(date);
        let display_date = to_display_string(date);

        if store.contains(&id) {
            debug!("Puzzle for {} already downloaded", display_date);
            report.skipped += 1;
            return Ok(());
        }

        let url = match self.config.listing_url.join(&entry.download_url) {
            Ok(url) => url,
            Err(e) => {
                error!(
                    "Failed to download puzzle for {}: bad link {:?}: {}",
                    display_date, entry.download_url, e
                );
                report.failures.push(EntryFailure {
                    raw_date_text: entry.raw_date_text.clone(),
                    reason: format!("Invalid URL {}: {}", entry.download_url, e),
                });
                return Ok(());
            }
        };

        if self.config.dry_run {
            // Nothing is recorded on a dry run, so repeats are caught here.
            if report.downloaded.contains(&id) {
                debug!("Puzzle for {} already listed", display_date);
                report.skipped += 1;
                return Ok(());
            }
            info!("Would download puzzle for {} from {}", display_date, url);
            report.downloaded.push(id);
            return Ok(());
        }

        let dest = self.output_path(&id);
        match self.source.download_to_file(&url, &dest).await {
            Ok(bytes) => {
                store.record_success(id.clone())?;
                info!("Downloaded puzzle for {} ({} bytes)", display_date, bytes);
                report.downloaded.push(id);
            }
            Err(e) => {
                error!("Failed to download puzzle for {}: {}", display_date, e);
                report.failures.push(EntryFailure {
                    raw_date_text: entry.raw_date_text.clone(),
                    reason: e.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Run sync passes forever at the configured interval.
    ///
    /// A failed pass is logged; the next tick tries again.
    pub async fn run_periodic(&self, store: &mut dyn DownloadedSet) {
        let mut ticker = interval(self.config.interval);

        info!("Starting periodic sync every {:?}", self.config.interval);

        loop {
            ticker.tick().await;

            match self.sync_once(store).await {
                Ok(report) => {
                    info!(
                        "Periodic sync completed: {} downloaded, {} failed",
                        report.downloaded.len(),
                        report.failures.len()
                    );
                }
                Err(e) => {
                    error!("Periodic sync failed: {}", e);
                }
            }
        }
    }
}
