///! One-day rollback of the incidence data
///!
///! Used when the incidence feed re-publishes the already stored day with
///! different numbers: the stored day is undone so that reapplying the
///! corrected snapshot replaces it instead of stacking a second entry.

use corona_common::CoronaState;

use crate::dates::previous_day;
use crate::trend::recent_trend;

/// Revert the most recent incidence day of `state` in place.
///
/// Only incidence-owned fields are touched; vaccination, hospitalization and
/// reproduction number data stay as they are.
pub fn rollback_one_day(state: &mut CoronaState) {
    for region in &mut state.regions {
        region.cases = region.cases_previous_day;
        region.deaths = region.deaths_previous_day;

        region.incidence_history.pop();
        region.state_incidence_history.pop();
        if let Some(last) = region.incidence_history.last() {
            region.incidence_7d = *last;
        }
        if let Some(last) = region.state_incidence_history.last() {
            region.state_incidence_7d = *last;
        }

        region.incidence_trend = recent_trend(&region.incidence_history);
        region.state_incidence_trend = recent_trend(&region.state_incidence_history);
    }

    let country = &mut state.country;
    country.cases = country.cases_previous_day;
    country.new_cases = country.new_cases_previous_day;
    country.incidence_history.pop();
    if let Some(last) = country.incidence_history.last() {
        country.incidence_7d = *last;
    }
    country.incidence_trend = recent_trend(&country.incidence_history);

    state.source_updated_at = state.source_updated_at.map(previous_day);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use corona_common::{CountryAggregate, Region, Trend};

    fn region() -> Region {
        Region {
            id: 7,
            name: "Musterstadt".to_string(),
            kind: "Kreisfreie Stadt".to_string(),
            county: "SK Musterstadt".to_string(),
            state_id: "9".to_string(),
            state_name: "Bayern".to_string(),
            population: 100_000,
            state_population: 13_000_000,
            cases: 115,
            cases_previous_day: 100,
            deaths: 4,
            deaths_previous_day: 3,
            cases_per_100k: 115.0,
            incidence_7d: 13.0,
            state_incidence_7d: 30.0,
            incidence_history: vec![10.0, 12.0, 13.0],
            state_incidence_history: vec![28.0, 29.0, 30.0],
            incidence_trend: Trend::default(),
            state_incidence_trend: Trend::default(),
            last_update: "18.10.2021, 00:00 Uhr".to_string(),
        }
    }

    #[test]
    fn test_rollback_restores_previous_day() {
        let mut state = CoronaState {
            regions: vec![region()],
            country: CountryAggregate {
                cases: 1115,
                cases_previous_day: 1100,
                new_cases: 15,
                new_cases_previous_day: 20,
                incidence_7d: 31.0,
                incidence_history: vec![29.0, 31.0],
                reproduction_number: Some(0.9),
                ..Default::default()
            },
            source_updated_at: NaiveDate::from_ymd_opt(2021, 10, 18),
            ..Default::default()
        };

        rollback_one_day(&mut state);

        let r = &state.regions[0];
        assert_eq!(r.cases, 100);
        assert_eq!(r.deaths, 3);
        assert_eq!(r.incidence_history, vec![10.0, 12.0]);
        assert_eq!(r.state_incidence_history, vec![28.0, 29.0]);
        assert_eq!(r.incidence_7d, 12.0);
        assert_eq!(r.incidence_trend.slope, Some(2.0));

        assert_eq!(state.country.cases, 1100);
        assert_eq!(state.country.new_cases, 20);
        assert_eq!(state.country.incidence_history, vec![29.0]);
        assert_eq!(state.country.incidence_trend.slope, Some(0.0));
        assert_eq!(state.country.reproduction_number, Some(0.9));
        assert_eq!(state.source_updated_at, NaiveDate::from_ymd_opt(2021, 10, 17));
    }

    #[test]
    fn test_rollback_on_empty_history() {
        let mut r = region();
        r.incidence_history.clear();
        r.state_incidence_history.clear();
        let mut state = CoronaState {
            regions: vec![r],
            ..Default::default()
        };

        rollback_one_day(&mut state);
        assert!(state.regions[0].incidence_history.is_empty());
        assert_eq!(state.regions[0].incidence_trend, Trend::default());
        assert_eq!(state.source_updated_at, None);
    }
}
