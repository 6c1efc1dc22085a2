///! Read-only views over the cached document
///!
///! The route layer calls these; nothing here mutates state.

use corona_common::{
    CoronaState, DATA_LICENSE, HospitalizationReport, RegionHospitalization, RegionReport,
    RegionVaccination, VaccinationReport,
};
use std::sync::Arc;

use super::store::StateStore;

/// Region figures together with its state's vaccination and hospitalization
/// numbers and the national aggregate.
pub fn region_report(state: &CoronaState, region_id: u32) -> Option<RegionReport> {
    let region = state.region(region_id)?;

    let vaccination = state.vaccination.as_ref().map(|block| RegionVaccination {
        state: block.states.get(&region.state_id).cloned(),
        country: block.country,
        last_updated: block.last_updated,
        fetched_at: block.fetched_at,
    });

    let hospitalization = state.hospitalization.as_ref().map(|block| RegionHospitalization {
        state: block.states.get(&region.state_id).cloned(),
        country: block.country,
        last_updated: block.last_updated,
        fetched_at: block.fetched_at,
    });

    Some(RegionReport {
        region: region.clone(),
        country: state.country.clone(),
        vaccination,
        hospitalization,
        source_updated_at: state.source_updated_at,
        fetched_at: state.fetched_at,
        license: DATA_LICENSE.to_string(),
    })
}

pub fn vaccination_report(state: &CoronaState) -> Option<VaccinationReport> {
    state.vaccination.clone().map(|vaccination| VaccinationReport {
        vaccination,
        license: DATA_LICENSE.to_string(),
    })
}

pub fn hospitalization_report(state: &CoronaState) -> Option<HospitalizationReport> {
    state.hospitalization.clone().map(|hospitalization| HospitalizationReport {
        hospitalization,
        license: DATA_LICENSE.to_string(),
    })
}

/// Query handle bound to the live store; every call reads a fresh snapshot.
#[derive(Clone)]
pub struct CoronaQuery {
    store: Arc<StateStore>,
}

impl CoronaQuery {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn region(&self, region_id: u32) -> Option<RegionReport> {
        let state = self.store.read()?;
        region_report(&state, region_id)
    }

    pub fn vaccination(&self) -> Option<VaccinationReport> {
        let state = self.store.read()?;
        vaccination_report(&state)
    }

    pub fn hospitalization(&self) -> Option<HospitalizationReport> {
        let state = self.store.read()?;
        hospitalization_report(&state)
    }
}
