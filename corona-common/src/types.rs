///! Cached corona document
///!
///! One `CoronaState` is kept per process. It is built up by the feed
///! connectors and persisted as a single JSON file.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of daily entries kept in any history array.
pub const MAX_HISTORY_DAYS: usize = 14;

/// Identifier of a federal state, e.g. "9" for Bayern.
pub type StateId = String;

/// Linear trend over a short series (slope and one-step-ahead prediction).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Trend {
    pub slope: Option<f64>,
    pub predicted_value: Option<f64>,
}

/// A district with its incidence history and trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Upstream object id, used as the public region id
    pub id: u32,
    /// Short name, e.g. "München"
    pub name: String,
    /// District kind, e.g. "Kreisfreie Stadt"
    pub kind: String,
    /// Full display name, e.g. "SK München"
    pub county: String,
    pub state_id: StateId,
    pub state_name: String,
    pub population: i64,
    pub state_population: i64,
    pub cases: i64,
    pub cases_previous_day: i64,
    pub deaths: i64,
    pub deaths_previous_day: i64,
    pub cases_per_100k: f64,
    /// 7-day incidence of the district
    pub incidence_7d: f64,
    /// 7-day incidence of the parent state
    pub state_incidence_7d: f64,
    /// Newest last, at most `MAX_HISTORY_DAYS` entries
    pub incidence_history: Vec<f64>,
    pub state_incidence_history: Vec<f64>,
    pub incidence_trend: Trend,
    pub state_incidence_trend: Trend,
    /// Raw upstream "last update" text, e.g. "18.10.2021, 00:00 Uhr"
    pub last_update: String,
}

/// National figures. The reproduction number fields are owned by the
/// R-value connector, everything else by the incidence connector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountryAggregate {
    pub cases: i64,
    pub cases_previous_day: i64,
    pub new_cases: i64,
    pub new_cases_previous_day: i64,
    pub incidence_7d: f64,
    pub incidence_history: Vec<f64>,
    pub incidence_trend: Trend,
    pub reproduction_number: Option<f64>,
    /// Calendar day the reproduction number refers to
    pub reproduction_number_date: Option<NaiveDate>,
    pub reproduction_number_trend: Trend,
    /// When the reproduction number was last accepted
    pub reproduction_number_updated_at: Option<DateTime<Utc>>,
}

/// Vaccination figures of one state or the whole country.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VaccinationStats {
    /// People vaccinated at least once (cumulative)
    pub cumulated: i64,
    /// Increase of `cumulated` against the previous report day
    pub delta: i64,
    pub per_1000: f64,
    /// Percentage of the population vaccinated at least once
    pub quote: f64,
    pub quote_fully_vaccinated: f64,
    pub quote_booster: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationState {
    pub state_id: StateId,
    pub name: String,
    #[serde(flatten)]
    pub stats: VaccinationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationBlock {
    pub states: BTreeMap<StateId, VaccinationState>,
    pub country: VaccinationStats,
    /// Report day of the data
    pub last_updated: NaiveDate,
    /// `Last-Modified` of the report file, if the server sent one
    #[serde(default)]
    pub source_modified_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

/// 7-day hospitalization figures of one state or the whole country.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HospitalizationStats {
    pub incidence: f64,
    pub cases: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalizationState {
    pub state_id: StateId,
    pub name: String,
    #[serde(flatten)]
    pub stats: HospitalizationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalizationBlock {
    pub states: BTreeMap<StateId, HospitalizationState>,
    pub country: HospitalizationStats,
    pub last_updated: NaiveDate,
    pub fetched_at: DateTime<Utc>,
}

/// The whole cached document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoronaState {
    pub regions: Vec<Region>,
    pub country: CountryAggregate,
    #[serde(default)]
    pub vaccination: Option<VaccinationBlock>,
    #[serde(default)]
    pub hospitalization: Option<HospitalizationBlock>,
    /// Day the incidence data refers to
    pub source_updated_at: Option<NaiveDate>,
    /// When the incidence data was fetched
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CoronaState {
    /// Find a region by its id
    pub fn region(&self, id: u32) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Whether the incidence connector has populated this document yet
    pub fn has_incidence(&self) -> bool {
        !self.regions.is_empty() && self.source_updated_at.is_some()
    }
}
