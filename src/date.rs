//! Date parsing and formatting for puzzle listings.
//!
//! Listing pages describe dates as free text ("Monday 1st January 2024",
//! "1 Jan 2024", "2024-01-01"). Everything downstream works on calendar
//! dates, so no timezone is ever applied.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::models::FileSafeDate;

/// Errors that can occur while reading a date.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("Empty date text")]
    Empty,

    #[error("Unparseable date: {0:?}")]
    Unparseable(String),
}

/// Formats tried in order once weekdays, ordinals and commas are stripped.
const DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
];

const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "mon",
    "tue",
    "tues",
    "wed",
    "thu",
    "thur",
    "thurs",
    "fri",
    "sat",
    "sun",
];

fn ordinal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap())
}

/// Parse free-text date into a calendar date.
pub fn parse_display_date(raw: &str) -> Result<NaiveDate, DateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateError::Empty);
    }

    // ISO timestamps: keep the date part
    if trimmed.len() >= 10 && trimmed.is_char_boundary(10) {
        if let Ok(d) = NaiveDate::parse_from_str(&trimmed[..10], "%Y-%m-%d") {
            return Ok(d);
        }
    }

    let cleaned = normalize(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
        .ok_or_else(|| DateError::Unparseable(trimmed.to_string()))
}

/// Drop a leading weekday, ordinal suffixes and commas; collapse whitespace.
fn normalize(text: &str) -> String {
    let without_ordinals = ordinal_regex().replace_all(text, "$1");
    let without_commas = without_ordinals.replace(',', " ");

    let mut words: Vec<&str> = without_commas.split_whitespace().collect();
    if let Some(first) = words.first() {
        let first = first.trim_end_matches('.').to_lowercase();
        if WEEKDAYS.contains(&first.as_str()) {
            words.remove(0);
        }
    }

    words.join(" ")
}

/// Compact `DDMMYY` identifier for a date.
pub fn to_file_safe_id(date: NaiveDate) -> FileSafeDate {
    FileSafeDate::from_date(date)
}

/// Human-readable form used in log lines.
pub fn to_display_string(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
