//! Core data models for the puzzle scraper.

mod ids;
mod puzzle;

pub use ids::*;
pub use puzzle::*;
