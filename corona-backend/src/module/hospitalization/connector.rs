///! Hospitalization connector

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corona_common::{CoronaState, HospitalizationBlock, HospitalizationState, HospitalizationStats};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::parser::parse_hospitalization_csv;
use super::types::{HospitalizationFigures, HospitalizationPayload};
use crate::error::{EngineError, Result};
use crate::module::connector::{CadenceClass, Connector, NoChangeReason, Reconciled, UpdateOutcome};
use crate::module::feed::FeedClient;
use crate::module::plausibility::{finite_non_negative, non_negative, present};
use crate::module::states::{FEDERAL_STATES, NATIONAL_ID};

pub const HOSPITALIZATION_ID: &str = "[HOSP]";

const COUNTRY_NAME: &str = "Bundesgebiet";

pub struct HospitalizationConnector {
    client: Arc<dyn FeedClient>,
    url: String,
}

impl HospitalizationConnector {
    pub fn new(client: Arc<dyn FeedClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch_and_reconcile(&self, previous: &CoronaState) -> Result<Reconciled> {
        let body = self.client.fetch_text(&self.url).await?;
        let payload = parse_hospitalization_csv(&body)?;
        reconcile(Some(previous), &payload, Utc::now())
    }
}

#[async_trait]
impl Connector for HospitalizationConnector {
    fn id(&self) -> &'static str {
        HOSPITALIZATION_ID
    }

    fn cadence(&self) -> CadenceClass {
        CadenceClass::Frequent
    }

    async fn update(&self, previous: Option<Arc<CoronaState>>) -> UpdateOutcome {
        let Some(previous) = previous.filter(|p| p.has_incidence()) else {
            tracing::info!("{} No incidence data yet, postponing", HOSPITALIZATION_ID);
            return UpdateOutcome::NoChange(NoChangeReason::Postponed);
        };
        self.fetch_and_reconcile(&previous).await.into()
    }
}

fn build_stats(entity: &str, row: &HospitalizationFigures) -> Result<HospitalizationStats> {
    let stats = HospitalizationStats {
        incidence: present(entity, "hospitalization incidence", row.incidence)?,
        cases: present(entity, "hospitalized cases", row.cases)?,
    };
    finite_non_negative(entity, "hospitalization incidence", stats.incidence)?;
    non_negative(entity, "hospitalized cases", stats.cases)?;
    Ok(stats)
}

/// Replace the hospitalization block with the report's latest day.
pub fn reconcile(
    previous: Option<&CoronaState>,
    payload: &HospitalizationPayload,
    fetched_at: DateTime<Utc>,
) -> Result<Reconciled> {
    let Some(previous) = previous.filter(|p| p.has_incidence()) else {
        return Ok(Reconciled::NoChange(NoChangeReason::Postponed));
    };

    let cached = previous.hospitalization.as_ref();
    if let Some(c) = cached {
        if payload.as_of < c.last_updated {
            tracing::info!(
                "{} Retrieved data is outdated ({} < {}), checking again later",
                HOSPITALIZATION_ID,
                payload.as_of,
                c.last_updated
            );
            return Ok(Reconciled::NoChange(NoChangeReason::Outdated));
        }
    }

    let country_row = payload
        .row(NATIONAL_ID)
        .ok_or_else(|| EngineError::validation(COUNTRY_NAME, "missing from report"))?;
    let country = build_stats(COUNTRY_NAME, country_row)?;

    let mut states = BTreeMap::new();
    for (id, name) in FEDERAL_STATES {
        let row = payload
            .row(id)
            .ok_or_else(|| EngineError::validation(name, "missing from report"))?;
        let key = id.to_string();
        states.insert(
            key.clone(),
            HospitalizationState {
                state_id: key,
                name: name.to_string(),
                stats: build_stats(name, row)?,
            },
        );
    }

    if let Some(c) = cached.filter(|c| c.last_updated == payload.as_of) {
        if c.states == states && c.country == country {
            tracing::info!("{} Data of {} is unchanged", HOSPITALIZATION_ID, c.last_updated);
            return Ok(Reconciled::NoChange(NoChangeReason::Unchanged));
        }
        tracing::info!(
            "{} Correction for {} detected, replacing values",
            HOSPITALIZATION_ID,
            c.last_updated
        );
    }

    tracing::info!(
        "{} Accepted report of {}: incidence {:.2}, {} cases",
        HOSPITALIZATION_ID,
        payload.as_of,
        country.incidence,
        country.cases
    );

    let mut candidate = previous.clone();
    candidate.hospitalization = Some(HospitalizationBlock {
        states,
        country,
        last_updated: payload.as_of,
        fetched_at,
    });
    Ok(Reconciled::Updated(candidate))
}
