///! R value connector

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corona_common::CoronaState;
use std::sync::Arc;

use super::parser::parse_rvalue_csv;
use super::types::RValuePayload;
use crate::error::{EngineError, Result};
use crate::module::connector::{CadenceClass, Connector, NoChangeReason, Reconciled, UpdateOutcome};
use crate::module::feed::FeedClient;
use crate::module::plausibility::finite_non_negative;
use crate::trend::compute_trend;

pub const RVALUE_ID: &str = "[R_VAL]";

pub struct RValueConnector {
    client: Arc<dyn FeedClient>,
    url: String,
}

impl RValueConnector {
    pub fn new(client: Arc<dyn FeedClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch_and_reconcile(&self, previous: &CoronaState) -> Result<Reconciled> {
        let body = self.client.fetch_text(&self.url).await?;
        let payload = parse_rvalue_csv(&body)?;
        reconcile(Some(previous), &payload, Utc::now())
    }
}

#[async_trait]
impl Connector for RValueConnector {
    fn id(&self) -> &'static str {
        RVALUE_ID
    }

    fn cadence(&self) -> CadenceClass {
        CadenceClass::Frequent
    }

    async fn update(&self, previous: Option<Arc<CoronaState>>) -> UpdateOutcome {
        let Some(previous) = previous.filter(|p| p.has_incidence()) else {
            tracing::info!("{} No incidence data yet, postponing", RVALUE_ID);
            return UpdateOutcome::NoChange(NoChangeReason::Postponed);
        };

        self.fetch_and_reconcile(&previous).await.into()
    }
}

/// Store the newest estimate and the trend over the report's last rows.
pub fn reconcile(
    previous: Option<&CoronaState>,
    payload: &RValuePayload,
    fetched_at: DateTime<Utc>,
) -> Result<Reconciled> {
    let Some(previous) = previous.filter(|p| p.has_incidence()) else {
        return Ok(Reconciled::NoChange(NoChangeReason::Postponed));
    };
    let latest = payload
        .latest()
        .ok_or_else(|| EngineError::validation("reproduction number", "report is empty"))?;
    let trend = compute_trend(&payload.values());

    let country = &previous.country;
    if let Some(stored) = country.reproduction_number_date {
        if latest.date < stored {
            tracing::info!(
                "{} Retrieved data is outdated ({} < {}), checking again later",
                RVALUE_ID,
                latest.date,
                stored
            );
            return Ok(Reconciled::NoChange(NoChangeReason::Outdated));
        }
        if latest.date == stored {
            if country.reproduction_number == Some(latest.value)
                && country.reproduction_number_trend == trend
            {
                tracing::info!("{} Data of {} is unchanged", RVALUE_ID, stored);
                return Ok(Reconciled::NoChange(NoChangeReason::Unchanged));
            }
            tracing::info!("{} Correction for {} detected, replacing value", RVALUE_ID, stored);
        }
    }

    finite_non_negative("reproduction number", "value", latest.value)?;
    for (field, value) in [("trend slope", trend.slope), ("predicted value", trend.predicted_value)] {
        match value {
            Some(v) if v.is_finite() => {}
            _ => {
                return Err(EngineError::validation(
                    "reproduction number",
                    format!("{} is not finite", field),
                ));
            }
        }
    }

    let mut candidate = previous.clone();
    candidate.country.reproduction_number = Some(latest.value);
    candidate.country.reproduction_number_date = Some(latest.date);
    candidate.country.reproduction_number_trend = trend;
    candidate.country.reproduction_number_updated_at = Some(fetched_at);

    tracing::info!(
        "{} Accepted R value {:.2} of {}",
        RVALUE_ID,
        latest.value,
        latest.date
    );

    Ok(Reconciled::Updated(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::feed::MemoryFeedClient;
    use crate::module::rvalue::RValuePoint;
    use chrono::{NaiveDate, TimeZone};
    use corona_common::Region;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 10, d).unwrap()
    }

    fn seeded_state() -> CoronaState {
        let region: Region = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Kiel", "kind": "Kreisfreie Stadt", "county": "SK Kiel",
            "state_id": "1", "state_name": "Schleswig-Holstein",
            "population": 246601, "state_population": 2910875,
            "cases": 100, "cases_previous_day": 90, "deaths": 1, "deaths_previous_day": 1,
            "cases_per_100k": 40.5, "incidence_7d": 50.3, "state_incidence_7d": 41.1,
            "incidence_history": [50.3], "state_incidence_history": [41.1],
            "incidence_trend": {"slope": 0.0, "predicted_value": 50.3},
            "state_incidence_trend": {"slope": 0.0, "predicted_value": 41.1},
            "last_update": "18.10.2021, 00:00 Uhr"
        }))
        .unwrap();
        CoronaState {
            regions: vec![region],
            source_updated_at: Some(day(18)),
            ..Default::default()
        }
    }

    fn payload(values: &[(u32, f64)]) -> RValuePayload {
        RValuePayload {
            points: values
                .iter()
                .map(|(d, v)| RValuePoint { date: day(*d), value: *v })
                .collect(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 10, 18, 12, 14, 0).unwrap()
    }

    #[test]
    fn test_postponed_without_incidence() {
        let result = reconcile(None, &payload(&[(17, 0.9)]), now()).unwrap();
        assert_eq!(result, Reconciled::NoChange(NoChangeReason::Postponed));
        let result = reconcile(Some(&CoronaState::default()), &payload(&[(17, 0.9)]), now()).unwrap();
        assert_eq!(result, Reconciled::NoChange(NoChangeReason::Postponed));
    }

    #[test]
    fn test_accepts_and_computes_trend() {
        let Reconciled::Updated(state) =
            reconcile(Some(&seeded_state()), &payload(&[(15, 0.8), (16, 0.9), (17, 1.0)]), now()).unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(state.country.reproduction_number, Some(1.0));
        assert_eq!(state.country.reproduction_number_date, Some(day(17)));
        let slope = state.country.reproduction_number_trend.slope.unwrap();
        assert!((slope - 0.1).abs() < 1e-9);
        assert_eq!(state.country.reproduction_number_updated_at, Some(now()));
        assert_eq!(state.regions, seeded_state().regions);
    }

    #[test]
    fn test_outdated_unchanged_and_corrected() {
        let report = payload(&[(16, 0.9), (17, 1.0)]);
        let Reconciled::Updated(state) = reconcile(Some(&seeded_state()), &report, now()).unwrap() else {
            panic!("expected update");
        };

        assert_eq!(
            reconcile(Some(&state), &payload(&[(16, 0.9)]), now()).unwrap(),
            Reconciled::NoChange(NoChangeReason::Outdated)
        );
        assert_eq!(
            reconcile(Some(&state), &report, now()).unwrap(),
            Reconciled::NoChange(NoChangeReason::Unchanged)
        );

        let Reconciled::Updated(corrected) =
            reconcile(Some(&state), &payload(&[(16, 0.9), (17, 1.05)]), now()).unwrap()
        else {
            panic!("expected correction");
        };
        assert_eq!(corrected.country.reproduction_number, Some(1.05));
        assert_eq!(corrected.country.reproduction_number_date, Some(day(17)));
    }

    #[tokio::test]
    async fn test_update_fetches_and_reconciles() {
        let url = "http://feed/nowcast.csv";
        let client = Arc::new(MemoryFeedClient::new());
        client.set(
            url,
            "Datum,PS_COVID_Faelle,PS_7_Tage_R_Wert\n2021-10-16,1000,0.90\n2021-10-17,1000,1.00\n",
            None,
        );
        let connector = RValueConnector::new(client.clone(), url);
        let seeded = Arc::new(seeded_state());

        match connector.update(Some(seeded.clone())).await {
            UpdateOutcome::Updated(state) => {
                assert_eq!(state.country.reproduction_number, Some(1.0));
                assert_eq!(state.country.reproduction_number_date, Some(day(17)));
            }
            other => panic!("expected update, got {:?}", other),
        }

        client.remove(url);
        match connector.update(Some(seeded)).await {
            UpdateOutcome::Failed(e) => assert_eq!(e.category(), "fetch"),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
