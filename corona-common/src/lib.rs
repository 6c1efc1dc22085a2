//! Shared document schema for the corona backend and its readers.
//!
//! `types` is the persisted cache document, `response` the read-only
//! projections handed to the route and widget layers.

pub mod response;
pub mod types;

pub use response::{
    HospitalizationReport, RegionHospitalization, RegionReport, RegionVaccination,
    VaccinationReport, DATA_LICENSE,
};
pub use types::{
    CoronaState, CountryAggregate, HospitalizationBlock, HospitalizationState,
    HospitalizationStats, Region, StateId, Trend, VaccinationBlock, VaccinationState,
    VaccinationStats, MAX_HISTORY_DAYS,
};
