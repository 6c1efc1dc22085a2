///! Read-only views served to the route and widget layers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CountryAggregate, HospitalizationBlock, HospitalizationState, HospitalizationStats, Region,
    VaccinationBlock, VaccinationState, VaccinationStats,
};

/// Attribution required by the upstream data licence.
pub const DATA_LICENSE: &str = "Robert Koch-Institut (RKI), dl-de/by-2-0";

/// Vaccination figures for the state a region belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionVaccination {
    pub state: Option<VaccinationState>,
    pub country: VaccinationStats,
    pub last_updated: NaiveDate,
    pub fetched_at: DateTime<Utc>,
}

/// Hospitalization figures for the state a region belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionHospitalization {
    pub state: Option<HospitalizationState>,
    pub country: HospitalizationStats,
    pub last_updated: NaiveDate,
    pub fetched_at: DateTime<Utc>,
}

/// Everything a widget needs for one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub region: Region,
    pub country: CountryAggregate,
    pub vaccination: Option<RegionVaccination>,
    pub hospitalization: Option<RegionHospitalization>,
    pub source_updated_at: Option<NaiveDate>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub license: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationReport {
    #[serde(flatten)]
    pub vaccination: VaccinationBlock,
    pub license: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalizationReport {
    #[serde(flatten)]
    pub hospitalization: HospitalizationBlock,
    pub license: String,
}
