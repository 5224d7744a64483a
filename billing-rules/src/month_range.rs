use chrono::{Datelike, Months, NaiveDate};
use shared_types::DateRange;

use crate::dates::parse_iso_date;
use crate::error::RulesError;

/// A sub-range that never leaves one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthRange {
    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    pub fn to_wire(&self) -> DateRange {
        DateRange {
            inicial: self.start_iso(),
            fin: self.end_iso(),
        }
    }
}

fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// Partitions `[start, end]` into calendar-month-aligned sub-ranges.
///
/// Returns an empty list when `start` is after `end`.
pub fn split_by_month(start: NaiveDate, end: NaiveDate) -> Vec<MonthRange> {
    let mut ranges = Vec::new();
    if start > end {
        return ranges;
    }

    let mut cursor = start;
    loop {
        let Some(month_end) = last_day_of_month(cursor) else {
            break;
        };
        let chunk_end = month_end.min(end);
        ranges.push(MonthRange {
            start: cursor,
            end: chunk_end,
        });

        if chunk_end >= end {
            break;
        }
        match chunk_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }

    ranges
}

/// Same as [`split_by_month`] over ISO strings; invalid dates give no ranges.
pub fn split_iso_range(start: &str, end: &str) -> Vec<MonthRange> {
    match (parse_iso_date(start), parse_iso_date(end)) {
        (Ok(start), Ok(end)) => split_by_month(start, end),
        _ => Vec::new(),
    }
}

/// Validates a user-supplied range, reporting why it is unusable.
pub fn parse_iso_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), RulesError> {
    let start_date = parse_iso_date(start)?;
    let end_date = parse_iso_date(end)?;
    if start_date > end_date {
        return Err(RulesError::InvertedRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok((start_date, end_date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_single_month() {
        let ranges = split_by_month(ymd(2025, 3, 5), ymd(2025, 3, 20));
        assert_eq!(
            ranges,
            vec![MonthRange {
                start: ymd(2025, 3, 5),
                end: ymd(2025, 3, 20)
            }]
        );
    }

    #[test]
    fn test_clips_first_and_last_month() {
        let ranges = split_by_month(ymd(2025, 1, 15), ymd(2025, 3, 10));
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].start, ymd(2025, 1, 15));
        assert_eq!(ranges[0].end, ymd(2025, 1, 31));
        assert_eq!(ranges[1].start, ymd(2025, 2, 1));
        assert_eq!(ranges[1].end, ymd(2025, 2, 28));
        assert_eq!(ranges[2].start, ymd(2025, 3, 1));
        assert_eq!(ranges[2].end, ymd(2025, 3, 10));
    }

    #[test]
    fn test_leap_year_and_year_rollover() {
        let ranges = split_by_month(ymd(2023, 12, 20), ymd(2024, 2, 29));
        let ends: Vec<_> = ranges.iter().map(|r| r.end).collect();
        assert_eq!(ends, vec![ymd(2023, 12, 31), ymd(2024, 1, 31), ymd(2024, 2, 29)]);
    }

    #[test]
    fn test_same_day() {
        let ranges = split_by_month(ymd(2025, 6, 30), ymd(2025, 6, 30));
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start, ranges[0].end);
    }

    #[test]
    fn test_inverted_and_invalid_give_empty() {
        assert!(split_by_month(ymd(2025, 4, 1), ymd(2025, 3, 31)).is_empty());
        assert!(split_iso_range("2025-04-01", "2025-03-31").is_empty());
        assert!(split_iso_range("2025-13-01", "2025-12-31").is_empty());
        assert!(split_iso_range("abc", "2025-12-31").is_empty());
    }

    #[test]
    fn test_never_crosses_month_and_covers_interval() {
        let pairs = [
            (ymd(2024, 1, 1), ymd(2024, 12, 31)),
            (ymd(2024, 2, 29), ymd(2025, 3, 1)),
            (ymd(2025, 5, 31), ymd(2025, 6, 1)),
            (ymd(2022, 11, 17), ymd(2025, 1, 3)),
        ];

        for (start, end) in pairs {
            let ranges = split_by_month(start, end);
            assert_eq!(ranges.first().unwrap().start, start);
            assert_eq!(ranges.last().unwrap().end, end);

            for range in &ranges {
                assert!(range.start <= range.end);
                assert_eq!(range.start.year(), range.end.year());
                assert_eq!(range.start.month(), range.end.month());
            }

            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
            }
        }
    }

    #[test]
    fn test_parse_iso_range_reports_reason() {
        assert!(parse_iso_range("2025-01-01", "2025-01-31").is_ok());
        assert!(matches!(
            parse_iso_range("2025-02-01", "2025-01-31"),
            Err(RulesError::InvertedRange { .. })
        ));
        assert!(matches!(
            parse_iso_range("01/02/2025", "2025-01-31"),
            Err(RulesError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_wire_format() {
        let range = split_iso_range("2025-02-10", "2025-02-12")[0];
        let wire = range.to_wire();
        assert_eq!(wire.inicial, "2025-02-10");
        assert_eq!(wire.fin, "2025-02-12");
    }
}
