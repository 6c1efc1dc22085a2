///! Vaccination connector

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corona_common::{CoronaState, VaccinationBlock, VaccinationState, VaccinationStats};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::parser::parse_vaccination_csv;
use super::types::{VaccinationFigures, VaccinationPayload};
use crate::error::{EngineError, Result};
use crate::module::connector::{CadenceClass, Connector, NoChangeReason, Reconciled, UpdateOutcome};
use crate::module::feed::{FeedClient, Freshness};
use crate::module::plausibility::{finite_non_negative, non_negative, not_decreasing, percentage, present};
use crate::module::states::{FEDERAL_STATES, NATIONAL_ID};

pub const VACCINATION_ID: &str = "[VACC]";

const COUNTRY_NAME: &str = "Deutschland";

pub struct VaccinationConnector {
    client: Arc<dyn FeedClient>,
    url: String,
}

impl VaccinationConnector {
    pub fn new(client: Arc<dyn FeedClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch_and_reconcile(&self, previous: &CoronaState) -> Result<Reconciled> {
        let last_known = previous.vaccination.as_ref().and_then(|v| v.source_modified_at);
        let freshness = match self.client.check_freshness(&self.url, last_known).await {
            Ok(freshness) => freshness,
            Err(e) => {
                tracing::warn!("{} Freshness check failed, downloading anyway: {}", VACCINATION_ID, e);
                Freshness::unknown()
            }
        };

        if !freshness.is_newer {
            tracing::info!("{} Report not modified since last update", VACCINATION_ID);
            return Ok(Reconciled::NoChange(NoChangeReason::NotModified));
        }

        let body = self.client.fetch_text(&self.url).await?;
        let payload = parse_vaccination_csv(&body)?;
        reconcile(Some(previous), &payload, freshness.modified_at, Utc::now())
    }
}

#[async_trait]
impl Connector for VaccinationConnector {
    fn id(&self) -> &'static str {
        VACCINATION_ID
    }

    fn cadence(&self) -> CadenceClass {
        CadenceClass::Frequent
    }

    async fn update(&self, previous: Option<Arc<CoronaState>>) -> UpdateOutcome {
        let Some(previous) = previous.filter(|p| p.has_incidence()) else {
            tracing::info!("{} No incidence data yet, postponing", VACCINATION_ID);
            return UpdateOutcome::NoChange(NoChangeReason::Postponed);
        };
        self.fetch_and_reconcile(&previous).await.into()
    }
}

/// Cumulative count the daily delta is measured against.
///
/// For a re-published day the stored delta is taken back out so the delta
/// is recomputed instead of stacked.
fn baseline(prior: &VaccinationStats, same_day: bool) -> i64 {
    if same_day {
        prior.cumulated - prior.delta
    } else {
        prior.cumulated
    }
}

fn build_stats(
    entity: &str,
    row: &VaccinationFigures,
    prior: Option<&VaccinationStats>,
    same_day: bool,
) -> Result<VaccinationStats> {
    let cumulated = present(entity, "vaccinated at least once", row.cumulated)?;
    let quote = present(entity, "quote", row.quote)?;
    let quote_fully_vaccinated = present(entity, "quote fully vaccinated", row.quote_fully_vaccinated)?;
    let quote_booster = present(entity, "quote booster", row.quote_booster)?;

    let delta = prior.map_or(0, |p| (cumulated - baseline(p, same_day)).max(0));

    Ok(VaccinationStats {
        cumulated,
        delta,
        per_1000: quote * 10.0,
        quote,
        quote_fully_vaccinated,
        quote_booster,
    })
}

fn validate_stats(
    entity: &str,
    stats: &VaccinationStats,
    prior: Option<&VaccinationStats>,
    same_day: bool,
) -> Result<()> {
    non_negative(entity, "vaccinated at least once", stats.cumulated)?;
    non_negative(entity, "delta", stats.delta)?;
    finite_non_negative(entity, "per 1000", stats.per_1000)?;
    percentage(entity, "quote", stats.quote)?;
    percentage(entity, "quote fully vaccinated", stats.quote_fully_vaccinated)?;
    percentage(entity, "quote booster", stats.quote_booster)?;
    if let Some(prior) = prior {
        not_decreasing(
            entity,
            "vaccinated at least once",
            stats.cumulated,
            baseline(prior, same_day),
        )?;
    }
    Ok(())
}

/// Build the vaccination block from the report and validate it.
///
/// `source_modified_at` is the report's `Last-Modified`, kept for the next
/// freshness probe.
pub fn reconcile(
    previous: Option<&CoronaState>,
    payload: &VaccinationPayload,
    source_modified_at: Option<DateTime<Utc>>,
    fetched_at: DateTime<Utc>,
) -> Result<Reconciled> {
    let Some(previous) = previous.filter(|p| p.has_incidence()) else {
        return Ok(Reconciled::NoChange(NoChangeReason::Postponed));
    };

    let cached = previous.vaccination.as_ref();
    let same_day = match cached {
        Some(c) if payload.as_of < c.last_updated => {
            tracing::info!(
                "{} Retrieved data is outdated ({} < {}), checking again later",
                VACCINATION_ID,
                payload.as_of,
                c.last_updated
            );
            return Ok(Reconciled::NoChange(NoChangeReason::Outdated));
        }
        Some(c) => payload.as_of == c.last_updated,
        None => false,
    };

    let country_row = payload
        .row(NATIONAL_ID)
        .ok_or_else(|| EngineError::validation(COUNTRY_NAME, "missing from report"))?;
    let prior_country = cached.map(|c| &c.country);
    let country = build_stats(COUNTRY_NAME, country_row, prior_country, same_day)?;
    validate_stats(COUNTRY_NAME, &country, prior_country, same_day)?;
    if let (Some(prior), false) = (prior_country, same_day) {
        not_decreasing(COUNTRY_NAME, "quote", country.quote, prior.quote)?;
    }

    let mut states = BTreeMap::new();
    for (id, name) in FEDERAL_STATES {
        let row = payload
            .row(id)
            .ok_or_else(|| EngineError::validation(name, "missing from report"))?;
        if row.name != name {
            return Err(EngineError::validation(
                name,
                format!("state {} reported as '{}'", id, row.name),
            ));
        }

        let key = id.to_string();
        let prior = cached.and_then(|c| c.states.get(&key)).map(|s| &s.stats);
        let stats = build_stats(name, row, prior, same_day)?;
        validate_stats(name, &stats, prior, same_day)?;

        states.insert(
            key.clone(),
            VaccinationState {
                state_id: key,
                name: name.to_string(),
                stats,
            },
        );
    }

    if let Some(c) = cached {
        if same_day && c.states == states && c.country == country {
            if source_modified_at > c.source_modified_at {
                tracing::info!(
                    "{} Data of {} is unchanged, recording new modification time",
                    VACCINATION_ID,
                    c.last_updated
                );
                let mut candidate = previous.clone();
                if let Some(block) = candidate.vaccination.as_mut() {
                    block.source_modified_at = source_modified_at;
                    block.fetched_at = fetched_at;
                }
                return Ok(Reconciled::Updated(candidate));
            }
            tracing::info!("{} Data of {} is unchanged", VACCINATION_ID, c.last_updated);
            return Ok(Reconciled::NoChange(NoChangeReason::Unchanged));
        }
        if same_day {
            tracing::info!(
                "{} Correction for {} detected, recomputing deltas",
                VACCINATION_ID,
                c.last_updated
            );
        }
    }

    tracing::info!(
        "{} Accepted report of {}: quote {:.1}%, {} newly vaccinated",
        VACCINATION_ID,
        payload.as_of,
        country.quote,
        country.delta
    );

    let mut candidate = previous.clone();
    candidate.vaccination = Some(VaccinationBlock {
        states,
        country,
        last_updated: payload.as_of,
        source_modified_at,
        fetched_at,
    });
    Ok(Reconciled::Updated(candidate))
}
