//! Listing page extraction.
//!
//! Turns the raw listing page into an ordered list of [`PuzzleEntry`]s.
//! The publisher has changed page layouts before, so each layout gets its
//! own [`PageExtractor`] and the active one is picked from configuration:
//!
//! - **dom**: anchors inside table cells (`table tr td a`), link text is the date
//! - **embedded-json**: the `window.<GLOBAL> = {...}` state blob, `headline` is the date
//! - **auto**: dom first, embedded-json when the table yields nothing and the
//!   page assigns the state global

mod dom;
mod embedded;

pub use dom::DomExtractor;
pub use embedded::EmbeddedStateExtractor;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::models::PuzzleEntry;

/// Errors that can occur during extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Embedded state `{0}` not found in page")]
    StateNotFound(String),

    #[error("Embedded state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Strategy for reading the listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractStrategy {
    Dom,
    EmbeddedJson,
    #[default]
    Auto,
}

impl std::str::FromStr for ExtractStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dom" => Ok(ExtractStrategy::Dom),
            "embedded-json" | "json" => Ok(ExtractStrategy::EmbeddedJson),
            "auto" => Ok(ExtractStrategy::Auto),
            other => Err(format!(
                "unknown strategy '{}' (expected dom, embedded-json or auto)",
                other
            )),
        }
    }
}

/// Produces puzzle entries from a listing page.
///
/// Zero matches is an empty list, never an error.
pub trait PageExtractor: Send + Sync {
    /// Identifier for logging.
    fn name(&self) -> &'static str;

    fn extract(&self, page: &str) -> Result<Vec<PuzzleEntry>, ExtractError>;
}

/// Tries the table layout first and falls back to the embedded state blob
/// only when the page carries one.
pub struct AutoExtractor {
    dom: DomExtractor,
    embedded: EmbeddedStateExtractor,
}

impl AutoExtractor {
    pub fn new(dom: DomExtractor, embedded: EmbeddedStateExtractor) -> Self {
        Self { dom, embedded }
    }
}

impl PageExtractor for AutoExtractor {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn extract(&self, page: &str) -> Result<Vec<PuzzleEntry>, ExtractError> {
        let entries = self.dom.extract(page)?;
        if !entries.is_empty() {
            return Ok(entries);
        }

        if !self.embedded.has_state(page) {
            debug!("No table links and no embedded state found");
            return Ok(entries);
        }

        debug!("No table links found, trying embedded state");
        self.embedded.extract(page)
    }
}

/// Build the extractor selected by configuration.
pub fn build_extractor(config: &ExtractConfig) -> Result<Box<dyn PageExtractor>, ExtractError> {
    let extractor: Box<dyn PageExtractor> = match config.strategy {
        ExtractStrategy::Dom => Box::new(DomExtractor::new()),
        ExtractStrategy::EmbeddedJson => Box::new(EmbeddedStateExtractor::new(
            &config.state_global,
            &config.sentinel_name,
        )?),
        ExtractStrategy::Auto => Box::new(AutoExtractor::new(
            DomExtractor::new(),
            EmbeddedStateExtractor::new(&config.state_global, &config.sentinel_name)?,
        )),
    };
    Ok(extractor)
}
