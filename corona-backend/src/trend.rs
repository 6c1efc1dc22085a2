//! Least-squares trend over short daily series.

use corona_common::{Trend, MAX_HISTORY_DAYS};

/// Ordinary least-squares fit of `series` against `0..n`.
///
/// The predicted value is the fitted line evaluated one step past the end of
/// the series. An empty series has no trend, a single value a flat one.
pub fn compute_trend(series: &[f64]) -> Trend {
    match series {
        [] => Trend::default(),
        [only] => Trend {
            slope: Some(0.0),
            predicted_value: Some(*only),
        },
        _ => {
            let n = series.len() as f64;
            let mean_x = (n - 1.0) / 2.0;
            let mean_y = series.iter().sum::<f64>() / n;

            let mut sxy = 0.0;
            let mut sxx = 0.0;
            for (i, y) in series.iter().enumerate() {
                let dx = i as f64 - mean_x;
                sxy += dx * (y - mean_y);
                sxx += dx * dx;
            }

            let slope = sxy / sxx;
            let intercept = mean_y - slope * mean_x;

            Trend {
                slope: Some(slope),
                predicted_value: Some(intercept + slope * n),
            }
        }
    }
}

/// Trend over the most recent `MAX_HISTORY_DAYS` entries of a history.
pub fn recent_trend(history: &[f64]) -> Trend {
    let start = history.len().saturating_sub(MAX_HISTORY_DAYS);
    compute_trend(&history[start..])
}

/// Append `value` to a history, evicting the oldest entries beyond the cap.
pub fn append_bounded(history: &[f64], value: f64) -> Vec<f64> {
    let mut next = Vec::with_capacity(MAX_HISTORY_DAYS);
    let keep = history.len().min(MAX_HISTORY_DAYS - 1);
    next.extend_from_slice(&history[history.len() - keep..]);
    next.push(value);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_series() {
        let trend = compute_trend(&[]);
        assert_eq!(trend.slope, None);
        assert_eq!(trend.predicted_value, None);
    }

    #[test]
    fn test_single_value() {
        let trend = compute_trend(&[7.0]);
        assert_eq!(trend.slope, Some(0.0));
        assert_eq!(trend.predicted_value, Some(7.0));
    }

    #[test]
    fn test_linear_series() {
        let trend = compute_trend(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(trend.slope, Some(1.0));
        assert_eq!(trend.predicted_value, Some(6.0));
    }

    #[test]
    fn test_flat_and_falling() {
        let flat = compute_trend(&[4.0, 4.0, 4.0]);
        assert_eq!(flat.slope, Some(0.0));
        assert_eq!(flat.predicted_value, Some(4.0));

        let falling = compute_trend(&[10.0, 8.0, 6.0]);
        assert_eq!(falling.slope, Some(-2.0));
        assert_eq!(falling.predicted_value, Some(4.0));
    }

    #[test]
    fn test_noisy_series() {
        let trend = compute_trend(&[1.5, 2.5, 5.5, 6.5]);
        let slope = trend.slope.unwrap();
        assert!((slope - 1.8).abs() < 1e-9);
        assert!((trend.predicted_value.unwrap() - 8.5).abs() < 1e-9);
    }

    #[test]
    fn test_recent_trend_uses_window() {
        let mut history: Vec<f64> = vec![100.0; 5];
        history.extend((0..MAX_HISTORY_DAYS).map(|i| i as f64));
        let trend = recent_trend(&history);
        assert_eq!(trend.slope, Some(1.0));
    }

    #[test]
    fn test_append_bounded_evicts_oldest() {
        let mut history = Vec::new();
        for day in 0..20 {
            history = append_bounded(&history, day as f64);
        }
        assert_eq!(history.len(), MAX_HISTORY_DAYS);
        assert_eq!(history[0], 6.0);
        assert_eq!(history[MAX_HISTORY_DAYS - 1], 19.0);
    }

    #[test]
    fn test_append_bounded_short_history() {
        assert_eq!(append_bounded(&[10.0, 12.0], 13.0), vec![10.0, 12.0, 13.0]);
        assert_eq!(append_bounded(&[], 1.0), vec![1.0]);
    }
}
