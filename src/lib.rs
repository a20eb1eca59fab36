//! # Puzzle Scraper
//!
//! Downloads the publisher's printable daily puzzles and remembers which
//! dates have already been fetched, so repeated runs only pick up new ones.
//!
//! ## Architecture
//!
//! - **models**: Puzzle entries and `DDMMYY` file-safe date identifiers
//! - **date**: Free-text date parsing and formatting
//! - **extract**: Listing page extraction (table links or embedded state JSON)
//! - **fetch**: HTTP fetching and streaming downloads
//! - **storage**: Persisted record of downloaded dates
//! - **sync**: The fetch → extract → download → record pass
//! - **config**: Configuration loading and validation

pub mod config;
pub mod date;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod storage;
pub mod sync;

pub use models::*;
