///! Incidence connector: reconcile a district snapshot into the document

use async_trait::async_trait;
use chrono::{DateTime, Days, Utc};
use corona_common::{CoronaState, CountryAggregate, Region, MAX_HISTORY_DAYS};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::parser::parse_incidence_json;
use super::types::{DistrictAttributes, IncidencePayload};
use crate::error::{EngineError, Result};
use crate::module::connector::{CadenceClass, Connector, NoChangeReason, Reconciled, UpdateOutcome};
use crate::module::feed::FeedClient;
use crate::module::plausibility::{finite_non_negative, non_empty, non_negative, not_decreasing, present};
use crate::module::rollback::rollback_one_day;
use crate::trend::{append_bounded, recent_trend};

pub const INCIDENCE_ID: &str = "[INC]";

/// Allowed relative deviation between regions reporting the same state figure
const STATE_FIGURE_TOLERANCE: f64 = 1e-6;

pub struct IncidenceConnector {
    client: Arc<dyn FeedClient>,
    url: String,
}

impl IncidenceConnector {
    pub fn new(client: Arc<dyn FeedClient>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch_and_reconcile(&self, previous: Option<&CoronaState>) -> Result<Reconciled> {
        let body = self.client.fetch_text(&self.url).await?;
        let payload = parse_incidence_json(&body)?;
        tracing::debug!(
            "{} Fetched {} districts as of {}",
            INCIDENCE_ID,
            payload.districts.len(),
            payload.as_of
        );
        reconcile(previous, &payload, Utc::now())
    }
}

#[async_trait]
impl Connector for IncidenceConnector {
    fn id(&self) -> &'static str {
        INCIDENCE_ID
    }

    fn cadence(&self) -> CadenceClass {
        CadenceClass::Regular
    }

    async fn update(&self, previous: Option<Arc<CoronaState>>) -> UpdateOutcome {
        self.fetch_and_reconcile(previous.as_deref()).await.into()
    }
}

/// Figures of a federal state, taken from the first district seen
struct StateFigure {
    incidence: f64,
    population: i64,
    source: String,
}

/// Merge `payload` into `previous` and validate the result.
///
/// A payload for the stored day with different numbers is treated as a
/// correction: the stored day is rolled back and the payload applied again.
pub fn reconcile(
    previous: Option<&CoronaState>,
    payload: &IncidencePayload,
    fetched_at: DateTime<Utc>,
) -> Result<Reconciled> {
    let mut base = previous.cloned().unwrap_or_default();

    if let Some(stored) = base.source_updated_at {
        if payload.as_of < stored {
            tracing::info!(
                "{} Retrieved data is outdated ({} < {}), checking again later",
                INCIDENCE_ID,
                payload.as_of,
                stored
            );
            return Ok(Reconciled::NoChange(NoChangeReason::Outdated));
        }

        if payload.as_of == stored {
            if matches_stored(&base, &payload.districts) {
                tracing::info!("{} Data of {} is unchanged", INCIDENCE_ID, stored);
                return Ok(Reconciled::NoChange(NoChangeReason::Unchanged));
            }
            tracing::info!(
                "{} Correction for {} detected, rolling back one day",
                INCIDENCE_ID,
                stored
            );
            rollback_one_day(&mut base);
        }
    }

    let candidate = build_candidate(&base, payload, fetched_at)?;
    validate(&candidate, &base)?;

    tracing::info!(
        "{} Accepted data of {}: {} regions, {} new cases, incidence {:.1}",
        INCIDENCE_ID,
        payload.as_of,
        candidate.regions.len(),
        candidate.country.new_cases,
        candidate.country.incidence_7d
    );

    Ok(Reconciled::Updated(candidate))
}

fn entity_name(district: &DistrictAttributes) -> String {
    format!("region {} ({})", district.object_id, district.county)
}

fn same_figure(a: f64, b: f64) -> bool {
    (a - b).abs() <= STATE_FIGURE_TOLERANCE * a.abs().max(b.abs())
}

/// Every district identical to what is stored for the same day
fn matches_stored(base: &CoronaState, districts: &[DistrictAttributes]) -> bool {
    if base.regions.len() != districts.len() {
        return false;
    }

    let stored: HashMap<u32, &Region> = base.regions.iter().map(|r| (r.id, r)).collect();
    districts.iter().all(|d| {
        stored.get(&d.object_id).is_some_and(|r| {
            d.cases == Some(r.cases)
                && d.deaths == Some(r.deaths)
                && d.population == Some(r.population)
                && d.state_population == Some(r.state_population)
                && d.cases_per_100k == Some(r.cases_per_100k)
                && d.incidence_7d == Some(r.incidence_7d)
                && d.state_incidence_7d == Some(r.state_incidence_7d)
                && d.name == r.name
                && d.kind == r.kind
                && d.county == r.county
                && d.state_id == r.state_id
                && d.state_name == r.state_name
                && d.last_update == r.last_update
        })
    })
}

fn build_candidate(
    base: &CoronaState,
    payload: &IncidencePayload,
    fetched_at: DateTime<Utc>,
) -> Result<CoronaState> {
    let seeded = base.has_incidence();
    let stored: HashMap<u32, &Region> = base.regions.iter().map(|r| (r.id, r)).collect();

    let mut seen = HashSet::with_capacity(payload.districts.len());
    let mut state_figures: BTreeMap<String, StateFigure> = BTreeMap::new();
    let mut regions = Vec::with_capacity(payload.districts.len());

    for district in &payload.districts {
        let entity = entity_name(district);
        if !seen.insert(district.object_id) {
            return Err(EngineError::validation(entity, "region reported twice"));
        }

        let cases = present(&entity, "cases", district.cases)?;
        let deaths = present(&entity, "deaths", district.deaths)?;
        let population = present(&entity, "population", district.population)?;
        let state_population = present(&entity, "state population", district.state_population)?;
        let cases_per_100k = present(&entity, "cases per 100k", district.cases_per_100k)?;
        let incidence_7d = present(&entity, "7-day incidence", district.incidence_7d)?;
        let state_incidence_7d = present(&entity, "state 7-day incidence", district.state_incidence_7d)?;

        match state_figures.get(&district.state_id) {
            Some(first) => {
                if !same_figure(first.incidence, state_incidence_7d) {
                    return Err(EngineError::validation(
                        entity,
                        format!(
                            "state incidence {} differs from {} reported by {}",
                            state_incidence_7d, first.incidence, first.source
                        ),
                    ));
                }
                if first.population != state_population {
                    return Err(EngineError::validation(
                        entity,
                        format!(
                            "state population {} differs from {} reported by {}",
                            state_population, first.population, first.source
                        ),
                    ));
                }
            }
            None => {
                state_figures.insert(
                    district.state_id.clone(),
                    StateFigure {
                        incidence: state_incidence_7d,
                        population: state_population,
                        source: entity.clone(),
                    },
                );
            }
        }

        let cached = stored.get(&district.object_id).copied();
        let incidence_history = append_bounded(
            cached.map_or(&[][..], |c| c.incidence_history.as_slice()),
            incidence_7d,
        );
        let state_incidence_history = append_bounded(
            cached.map_or(&[][..], |c| c.state_incidence_history.as_slice()),
            state_incidence_7d,
        );

        regions.push(Region {
            id: district.object_id,
            name: district.name.clone(),
            kind: district.kind.clone(),
            county: district.county.clone(),
            state_id: district.state_id.clone(),
            state_name: district.state_name.clone(),
            population,
            state_population,
            cases,
            cases_previous_day: cached.map_or(cases, |c| c.cases),
            deaths,
            deaths_previous_day: cached.map_or(deaths, |c| c.deaths),
            cases_per_100k,
            incidence_7d,
            state_incidence_7d,
            incidence_trend: recent_trend(&incidence_history),
            state_incidence_trend: recent_trend(&state_incidence_history),
            incidence_history,
            state_incidence_history,
            last_update: district.last_update.clone(),
        });
    }

    let country = aggregate_country(base, seeded, &regions, &state_figures)?;

    Ok(CoronaState {
        regions,
        country,
        vaccination: base.vaccination.clone(),
        hospitalization: base.hospitalization.clone(),
        source_updated_at: Some(payload.as_of),
        fetched_at: Some(fetched_at),
    })
}

/// National figures; the incidence is weighted by state population
fn aggregate_country(
    base: &CoronaState,
    seeded: bool,
    regions: &[Region],
    state_figures: &BTreeMap<String, StateFigure>,
) -> Result<CountryAggregate> {
    let cases: i64 = regions.iter().map(|r| r.cases).sum();

    let population: i64 = state_figures.values().map(|s| s.population).sum();
    if population <= 0 {
        return Err(EngineError::validation(
            "country",
            "state populations sum to zero",
        ));
    }
    let infected: f64 = state_figures
        .values()
        .map(|s| s.incidence / 100_000.0 * s.population as f64)
        .sum();
    let incidence_7d = infected / population as f64 * 100_000.0;

    let (cases_previous_day, new_cases_previous_day, history) = if seeded {
        (
            base.country.cases,
            base.country.new_cases,
            base.country.incidence_history.as_slice(),
        )
    } else {
        (cases, 0, &[][..])
    };
    let incidence_history = append_bounded(history, incidence_7d);

    Ok(CountryAggregate {
        cases,
        cases_previous_day,
        new_cases: cases - cases_previous_day,
        new_cases_previous_day,
        incidence_7d,
        incidence_trend: recent_trend(&incidence_history),
        incidence_history,
        ..base.country.clone()
    })
}

fn check_history(entity: &str, field: &str, history: &[f64]) -> Result<()> {
    if history.is_empty() || history.len() > MAX_HISTORY_DAYS {
        return Err(EngineError::validation(
            entity,
            format!("{} has {} entries", field, history.len()),
        ));
    }
    for value in history {
        finite_non_negative(entity, field, *value)?;
    }
    Ok(())
}

/// Plausibility gate; any failure rejects the whole snapshot
fn validate(candidate: &CoronaState, base: &CoronaState) -> Result<()> {
    if candidate.regions.is_empty() {
        return Err(EngineError::validation("regions", "no regions in snapshot"));
    }

    for region in &candidate.regions {
        let entity = format!("region {} ({})", region.id, region.county);
        non_empty(&entity, "county", &region.county)?;
        non_empty(&entity, "state id", &region.state_id)?;
        non_empty(&entity, "state name", &region.state_name)?;
        non_negative(&entity, "population", region.population)?;
        non_negative(&entity, "state population", region.state_population)?;
        non_negative(&entity, "cases", region.cases)?;
        non_negative(&entity, "cases previous day", region.cases_previous_day)?;
        non_negative(&entity, "deaths", region.deaths)?;
        non_negative(&entity, "deaths previous day", region.deaths_previous_day)?;
        not_decreasing(&entity, "cases", region.cases, region.cases_previous_day)?;
        finite_non_negative(&entity, "cases per 100k", region.cases_per_100k)?;
        finite_non_negative(&entity, "7-day incidence", region.incidence_7d)?;
        finite_non_negative(&entity, "state 7-day incidence", region.state_incidence_7d)?;
        check_history(&entity, "incidence history", &region.incidence_history)?;
        check_history(&entity, "state incidence history", &region.state_incidence_history)?;
    }

    let country = &candidate.country;
    non_negative("country", "cases", country.cases)?;
    non_negative("country", "cases previous day", country.cases_previous_day)?;
    non_negative("country", "new cases", country.new_cases)?;
    non_negative("country", "new cases previous day", country.new_cases_previous_day)?;
    not_decreasing("country", "cases", country.cases, country.cases_previous_day)?;
    finite_non_negative("country", "7-day incidence", country.incidence_7d)?;
    check_history("country", "incidence history", &country.incidence_history)?;

    let (Some(as_of), Some(fetched_at)) = (candidate.source_updated_at, candidate.fetched_at) else {
        return Err(EngineError::validation("metadata", "timestamps missing"));
    };
    if let Some(stored) = base.source_updated_at {
        if as_of <= stored {
            return Err(EngineError::validation(
                "metadata",
                format!("data date {} is not newer than stored {}", as_of, stored),
            ));
        }
    }
    // the data day is local time, allow one day of offset against UTC
    let latest_plausible = fetched_at
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap_or(as_of);
    if as_of > latest_plausible {
        return Err(EngineError::validation(
            "metadata",
            format!("data date {} lies after fetch time {}", as_of, fetched_at),
        ));
    }

    Ok(())
}
