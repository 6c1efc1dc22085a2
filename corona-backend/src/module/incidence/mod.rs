///! District incidence feed
///!
///! Daily district snapshot with case counts and 7-day incidences. Drives
///! the region list, the national aggregate and all incidence histories.

pub mod connector;
pub mod parser;
pub mod types;

pub use connector::{INCIDENCE_ID, IncidenceConnector, reconcile};
pub use parser::parse_incidence_json;
pub use types::{DistrictAttributes, IncidencePayload};
