///! Nowcast CSV parser

use crate::dates::{parse_german_date, parse_iso_date};
use crate::error::{EngineError, Result};
use crate::module::report::{parse_float, reader, require_columns};

use super::types::{RValuePayload, RValuePoint, RValueRow};

pub const FEED: &str = "reproduction number";

/// Number of trailing estimates that make up the trend series
pub const TREND_WINDOW: usize = 7;

/// Keep the last `TREND_WINDOW` rows with a usable date and value.
pub fn parse_rvalue_csv(text: &str) -> Result<RValuePayload> {
    let mut rdr = reader(text);
    let headers = rdr.headers().map_err(|e| EngineError::parse(FEED, e))?.clone();
    require_columns(FEED, &headers, &["Datum", "PS_7_Tage_R_Wert"])?;

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize::<RValueRow>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => tracing::debug!("Skipping R value row {}: {}", index + 1, e),
        }
    }

    let mut points: Vec<RValuePoint> = rows
        .iter()
        .rev()
        .filter_map(|row| {
            let date = parse_iso_date(&row.date).or_else(|| parse_german_date(&row.date))?;
            let value = parse_float(&row.value).filter(|v| *v >= 0.0)?;
            Some(RValuePoint { date, value })
        })
        .take(TREND_WINDOW)
        .collect();
    points.reverse();

    if points.is_empty() {
        return Err(EngineError::parse(FEED, "no valid estimate in report"));
    }

    Ok(RValuePayload { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_takes_last_seven_valid_rows() {
        let mut csv = String::from("Datum,PS_COVID_Faelle,PS_7_Tage_R_Wert\n");
        for d in 1..=12 {
            csv.push_str(&format!("2021-10-{:02},100,{}\n", d, 0.8 + d as f64 / 100.0));
        }
        // still being estimated
        csv.push_str("2021-10-13,100,\n");
        csv.push_str("2021-10-14,100,\n");

        let payload = parse_rvalue_csv(&csv).unwrap();
        assert_eq!(payload.points.len(), TREND_WINDOW);
        assert_eq!(payload.points[0].date, NaiveDate::from_ymd_opt(2021, 10, 6).unwrap());
        let latest = payload.latest().unwrap();
        assert_eq!(latest.date, NaiveDate::from_ymd_opt(2021, 10, 12).unwrap());
        assert!((latest.value - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_skips_invalid_values() {
        let csv = "Datum,PS_7_Tage_R_Wert\n2021-10-16,0.9\n2021-10-17,-1\n2021-10-18,abc\n";
        let payload = parse_rvalue_csv(csv).unwrap();
        assert_eq!(payload.points.len(), 1);
        assert_eq!(payload.latest().unwrap().value, 0.9);
    }

    #[test]
    fn test_structural_failures() {
        let err = parse_rvalue_csv("Datum,R\n2021-10-16,0.9\n").unwrap_err();
        assert!(err.to_string().contains("PS_7_Tage_R_Wert"));

        let err = parse_rvalue_csv("Datum,PS_7_Tage_R_Wert\n2021-10-16,\n").unwrap_err();
        assert_eq!(err.category(), "parse");
    }
}
