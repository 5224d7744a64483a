use chrono::{Datelike, NaiveDate};

use crate::error::RulesError;

/// Parses a strict `YYYY-MM-DD` date as sent by the frontend.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, RulesError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| RulesError::InvalidDate(value.to_string()))
}

/// Parses the date formats Pergamo has been seen to emit.
///
/// Accepts `YYYY-MM-DD`, the same followed by a time part (`T` or space
/// separated), `DD/MM/YYYY` and `YYYY/MM/DD`.
pub fn parse_pergamo_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(prefix) = value.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    let date_part = value.split_whitespace().next()?;
    for format in ["%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }

    None
}

/// Months elapsed since year zero; differences give calendar-month distance.
pub fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2025-02-28").unwrap(), ymd(2025, 2, 28));
        assert!(parse_iso_date("2025-02-30").is_err());
        assert!(parse_iso_date("28/02/2025").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn test_parse_pergamo_date_variants() {
        assert_eq!(parse_pergamo_date("2025-03-15"), Some(ymd(2025, 3, 15)));
        assert_eq!(
            parse_pergamo_date("2025-03-15T08:30:00.000Z"),
            Some(ymd(2025, 3, 15))
        );
        assert_eq!(
            parse_pergamo_date("2025-03-15 08:30:00"),
            Some(ymd(2025, 3, 15))
        );
        assert_eq!(parse_pergamo_date("15/03/2025"), Some(ymd(2025, 3, 15)));
        assert_eq!(
            parse_pergamo_date("15/03/2025 10:00"),
            Some(ymd(2025, 3, 15))
        );
        assert_eq!(parse_pergamo_date("2025/03/15"), Some(ymd(2025, 3, 15)));
    }

    #[test]
    fn test_parse_pergamo_date_rejects_garbage() {
        assert!(parse_pergamo_date("").is_none());
        assert!(parse_pergamo_date("   ").is_none());
        assert!(parse_pergamo_date("sin fecha").is_none());
        assert!(parse_pergamo_date("ñññññññññññ").is_none());
    }

    #[test]
    fn test_month_index_handles_year_rollover() {
        assert_eq!(month_index(ymd(2025, 1, 1)) - month_index(ymd(2024, 12, 31)), 1);
        assert_eq!(month_index(ymd(2025, 3, 1)) - month_index(ymd(2025, 1, 31)), 2);
    }
}
