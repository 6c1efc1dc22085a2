///! Vaccination quota feed
///!
///! Daily per-state report of people vaccinated at least once plus the
///! first-dose, full and booster quotas.

pub mod connector;
pub mod parser;
pub mod types;

pub use connector::{VACCINATION_ID, VaccinationConnector, reconcile};
pub use parser::parse_vaccination_csv;
pub use types::{VaccinationFigures, VaccinationPayload};
