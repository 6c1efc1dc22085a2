///! Helpers for the comma separated report files

use csv::StringRecord;

use crate::error::{EngineError, Result};

/// Reader over a CSV body with a header row
pub fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

/// Fail with a parse error unless every column in `required` is present
pub fn require_columns(feed: &'static str, headers: &StringRecord, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h.trim_start_matches('\u{feff}') == *column) {
            return Err(EngineError::parse(feed, format!("missing column '{}'", column)));
        }
    }
    Ok(())
}

/// Lenient integer, `None` for blanks and garbage
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().filter(|v| v.fract() == 0.0).map(|v| v as i64))
}

/// Lenient float, `None` for blanks, garbage and non-finite values
pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
