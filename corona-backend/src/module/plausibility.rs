///! Range checks used by every connector's validation gate

use crate::error::{EngineError, Result};

pub fn non_negative(entity: &str, field: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(EngineError::validation(
            entity,
            format!("{} is negative ({})", field, value),
        ));
    }
    Ok(())
}

pub fn finite_non_negative(entity: &str, field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::validation(
            entity,
            format!("{} is not a finite non-negative number ({})", field, value),
        ));
    }
    Ok(())
}

pub fn percentage(entity: &str, field: &str, value: f64) -> Result<()> {
    finite_non_negative(entity, field, value)?;
    if value > 100.0 {
        return Err(EngineError::validation(
            entity,
            format!("{} exceeds 100% ({})", field, value),
        ));
    }
    Ok(())
}

/// Cumulative counters may only grow
pub fn not_decreasing<T: PartialOrd + std::fmt::Display>(
    entity: &str,
    field: &str,
    value: T,
    prior: T,
) -> Result<()> {
    if value < prior {
        return Err(EngineError::validation(
            entity,
            format!("{} decreased from {} to {}", field, prior, value),
        ));
    }
    Ok(())
}

/// Unwrap a field the feed may have left out
pub fn present<T>(entity: &str, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| EngineError::validation(entity, format!("{} is missing", field)))
}

pub fn non_empty(entity: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(entity, format!("{} is empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks() {
        assert!(non_negative("region 1", "cases", 0).is_ok());
        assert!(non_negative("region 1", "cases", -1).is_err());
        assert!(finite_non_negative("region 1", "incidence", f64::NAN).is_err());
        assert!(finite_non_negative("region 1", "incidence", f64::INFINITY).is_err());
        assert!(percentage("Bayern", "quote", 100.0).is_ok());
        assert!(percentage("Bayern", "quote", 100.1).is_err());
        assert!(not_decreasing("country", "cases", 10, 10).is_ok());
        assert!(not_decreasing("country", "cases", 9, 10).is_err());
        assert_eq!(present("region 1", "cases", Some(3)).unwrap(), 3);
        assert!(present::<i64>("region 1", "cases", None).is_err());
        assert!(non_empty("region 1", "county", " ").is_err());
    }

    #[test]
    fn test_message_names_field() {
        let err = not_decreasing("country", "cases", 5, 8).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error for country: cases decreased from 8 to 5"
        );
    }
}
