//! Date normalization for heterogeneous upstream formats.

use chrono::{DateTime, NaiveDate};

/// Parse a date in any of the formats the sources publish.
///
/// Accepts RFC 3339, ISO dates with or without a time/offset suffix, `DD/MM/YYYY`,
/// `DD.MM.YYYY` and RFC 2822. Slash dates are read day-first; use
/// [`parse_us_date`] for US sources.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    // "2025-06-30", "2025-06-30T10:00:00", "2025-06-30+02:00"
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    for format in ["%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }

    None
}

/// Parse a month-first date as published by Grants.gov and SAM.gov.
pub fn parse_us_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%m/%d/%Y")
        .ok()
        .or_else(|| parse_date(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-06-30T14:00:00Z"), Some(ymd(2025, 6, 30)));
        assert_eq!(parse_date("2025-06-30+02:00"), Some(ymd(2025, 6, 30)));
        assert_eq!(parse_date("2025-06-30T14:00:00"), Some(ymd(2025, 6, 30)));
        assert_eq!(parse_date("30/06/2025"), Some(ymd(2025, 6, 30)));
        assert_eq!(
            parse_date("Mon, 30 Jun 2025 09:00:00 +1200"),
            Some(ymd(2025, 6, 30))
        );
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_us_date_is_month_first() {
        assert_eq!(parse_us_date("07/04/2025"), Some(ymd(2025, 7, 4)));
        assert_eq!(parse_us_date("07/04/2025 12:00 AM EDT"), Some(ymd(2025, 7, 4)));
        assert_eq!(parse_us_date("2025-07-04"), Some(ymd(2025, 7, 4)));
    }
}
