//! File-safe date identifiers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compact `DDMMYY` identifier for a puzzle date.
///
/// Used both as the deduplication key in the download record and as the
/// stem of the downloaded file name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSafeDate(String);

impl FileSafeDate {
    /// Derive the identifier from calendar fields. No timezone is involved.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%d%m%y").to_string())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Output file name for this date, e.g. `010124.pdf`.
    pub fn pdf_filename(&self) -> String {
        format!("{}.pdf", self.0)
    }
}

impl fmt::Display for FileSafeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for FileSafeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSafeDate({})", self.0)
    }
}

impl From<NaiveDate> for FileSafeDate {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

impl From<&str> for FileSafeDate {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_date_zero_pads() {
        let id = FileSafeDate::from_date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(id.as_str(), "010124");
    }

    #[test]
    fn test_from_date_two_digit_fields() {
        let id = FileSafeDate::from_date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap());
        assert_eq!(id.as_str(), "311299");
    }

    #[test]
    fn test_year_wraps_to_last_two_digits() {
        let id = FileSafeDate::from_date(NaiveDate::from_ymd_opt(2100, 3, 5).unwrap());
        assert_eq!(id.as_str(), "050300");
    }

    #[test]
    fn test_pdf_filename() {
        let id = FileSafeDate::from("150624");
        assert_eq!(id.pdf_filename(), "150624.pdf");
    }

    #[test]
    fn test_serializes_as_bare_string() {
        let id = FileSafeDate::from("020124");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"020124\"");

        let parsed: FileSafeDate = serde_json::from_str("\"020124\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_debug_and_display() {
        let id = FileSafeDate::from("010124");
        assert_eq!(format!("{}", id), "010124");
        assert!(format!("{:?}", id).contains("010124"));
    }
}
