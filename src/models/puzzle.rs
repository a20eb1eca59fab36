//! Puzzle listing entries.

use serde::{Deserialize, Serialize};

/// A single downloadable puzzle found on the listing page.
///
/// The URL is kept as found on the page; relative links are resolved
/// against the listing URL by the sync orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleEntry {
    pub download_url: String,
    pub raw_date_text: String,
}

impl PuzzleEntry {
    pub fn new(download_url: impl Into<String>, raw_date_text: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            raw_date_text: raw_date_text.into(),
        }
    }
}
