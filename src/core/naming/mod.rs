//! # Naming Module
//!
//! Canonical names for archived files and month folders.
//!
//! - Files: `{CC}_{YYYYMMDD}_{HHMMSS}.{ext}`, or `{YYYYMMDD}_{HHMMSS}.{ext}`
//!   when no country is known. The extension is kept exactly as it was.
//! - Folders: `{YYYY}_{MM}_{CC[,CC...]}`, or `{YYYY}_{MM}` before any country
//!   is known. Countries keep the order in which they first arrived.
//!
//! A name that parses as canonical marks a file as already processed.

use crate::core::scanner::split_name;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static CANONICAL_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([A-Z]{2})_)?(\d{8})_(\d{6})$").expect("canonical file pattern is valid")
});

static MONTH_FOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})_(\d{2})(?:_(.+))?$").expect("month folder pattern is valid")
});

const DATE_FORMAT: &str = "%Y%m%d";
const TIME_FORMAT: &str = "%H%M%S";

/// Stem of a canonical file name (no extension)
pub fn canonical_stem(captured_at: NaiveDateTime, country: Option<&str>) -> String {
    let date = captured_at.format(DATE_FORMAT);
    let time = captured_at.format(TIME_FORMAT);
    match country.filter(|c| !c.is_empty()) {
        Some(code) => format!("{}_{}_{}", code, date, time),
        None => format!("{}_{}", date, time),
    }
}

/// Canonical file name with the original extension re-appended unchanged
pub fn canonical_file_name(
    captured_at: NaiveDateTime,
    country: Option<&str>,
    extension: &str,
) -> String {
    join_extension(&canonical_stem(captured_at, country), extension)
}

/// `stem.ext`, or just `stem` when there is no extension
pub fn join_extension(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// A file name that is already in canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalName {
    pub country: Option<String>,
    pub captured_at: NaiveDateTime,
    pub extension: String,
}

impl CanonicalName {
    /// Parse a file name; `None` unless it is canonical with a real date and time
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, extension) = split_name(file_name);
        let captures = CANONICAL_FILE.captures(stem)?;

        let date = NaiveDate::parse_from_str(&captures[2], DATE_FORMAT).ok()?;
        let time = NaiveTime::parse_from_str(&captures[3], TIME_FORMAT).ok()?;

        Some(Self {
            country: captures.get(1).map(|m| m.as_str().to_string()),
            captured_at: date.and_time(time),
            extension: extension.to_string(),
        })
    }

    /// Capture date as `YYYYMMDD`
    pub fn date_key(&self) -> String {
        self.captured_at.format(DATE_FORMAT).to_string()
    }

    /// Rebuild the file name
    pub fn file_name(&self) -> String {
        canonical_file_name(self.captured_at, self.country.as_deref(), &self.extension)
    }
}

/// Capture date as `YYYYMMDD`
pub fn date_key(captured_at: NaiveDateTime) -> String {
    captured_at.format(DATE_FORMAT).to_string()
}

/// Calendar month used to bucket files
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// `None` for a month outside 1..=12 or a year that does not fit four digits
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((0..=9999).contains(&year) && (1..=12).contains(&month)).then_some(Self { year, month })
    }

    pub fn of(captured_at: NaiveDateTime) -> Self {
        Self {
            year: captured_at.year(),
            month: captured_at.month(),
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}_{:02}", self.year, self.month)
    }
}

/// Canonical month folder name
pub fn canonical_folder_name(year_month: YearMonth, countries: &[String]) -> String {
    if countries.is_empty() {
        year_month.to_string()
    } else {
        format!("{}_{}", year_month, countries.join(","))
    }
}

/// Parse a month folder name into its month and country list.
///
/// Returns `None` for directories that are not month folders.
pub fn parse_folder_name(name: &str) -> Option<(YearMonth, Vec<String>)> {
    let captures = MONTH_FOLDER.captures(name)?;
    let year = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let year_month = YearMonth::new(year, month)?;

    let mut countries: Vec<String> = Vec::new();
    if let Some(list) = captures.get(3) {
        for code in list.as_str().split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if !countries.iter().any(|c| c == code) {
                countries.push(code.to_string());
            }
        }
    }

    Some((year_month, countries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn file_name_with_country() {
        let name = canonical_file_name(stamp("2024-05-01 10:20:30"), Some("FR"), "jpg");
        assert_eq!(name, "FR_20240501_102030.jpg");
    }

    #[test]
    fn file_name_without_country_keeps_extension_case() {
        let name = canonical_file_name(stamp("2024-05-01 08:00:05"), None, "MOV");
        assert_eq!(name, "20240501_080005.MOV");
        assert_eq!(
            canonical_file_name(stamp("2024-05-01 08:00:05"), Some(""), "mp4"),
            "20240501_080005.mp4"
        );
    }

    #[test]
    fn parses_canonical_names() {
        let parsed = CanonicalName::parse("FR_20240501_102030.jpg").unwrap();
        assert_eq!(parsed.country.as_deref(), Some("FR"));
        assert_eq!(parsed.date_key(), "20240501");
        assert_eq!(parsed.file_name(), "FR_20240501_102030.jpg");

        let bare = CanonicalName::parse("20240501_102030.mp4").unwrap();
        assert!(bare.country.is_none());
    }

    #[test]
    fn rejects_non_canonical_names() {
        assert!(CanonicalName::parse("IMG_0001.jpg").is_none());
        assert!(CanonicalName::parse("IMG_20240501_102030.jpg").is_none());
        assert!(CanonicalName::parse("fr_20240501_102030.jpg").is_none());
        assert!(CanonicalName::parse("FR_20241301_102030.jpg").is_none());
        assert!(CanonicalName::parse("FR_20240501_256030.jpg").is_none());
    }

    #[test]
    fn folder_names_round_trip() {
        let may = YearMonth::new(2024, 5).unwrap();
        let countries = vec!["FR".to_string(), "DE".to_string()];
        let name = canonical_folder_name(may, &countries);
        assert_eq!(name, "2024_05_FR,DE");
        assert_eq!(parse_folder_name(&name), Some((may, countries)));
    }

    #[test]
    fn folder_without_country() {
        let may = YearMonth::new(2024, 5).unwrap();
        assert_eq!(canonical_folder_name(may, &[]), "2024_05");
        assert_eq!(parse_folder_name("2024_05"), Some((may, vec![])));
    }

    #[test]
    fn folder_country_order_is_preserved() {
        let (_, countries) = parse_folder_name("2023_12_IT,AT,IT").unwrap();
        assert_eq!(countries, vec!["IT".to_string(), "AT".to_string()]);
    }

    #[test]
    fn non_month_folders_are_ignored() {
        assert!(parse_folder_name("duplicates").is_none());
        assert!(parse_folder_name("2024_13_FR").is_none());
        assert!(parse_folder_name("2024-05").is_none());
    }
}
