///! Date helpers shared by the feed parsers

use chrono::{DateTime, Days, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Leading `DD.MM.YYYY` of upstream strings like "18.10.2021, 00:00 Uhr"
static GERMAN_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap());

/// Parse the calendar day from a `DD.MM.YYYY[, ...]` string.
pub fn parse_german_date(text: &str) -> Option<NaiveDate> {
    let caps = GERMAN_DATE.captures(text)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an ISO `YYYY-MM-DD` day as used by the CSV reports.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

/// Parse an HTTP `Last-Modified` header value.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// The calendar day before `date`.
pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}
