///! Hospitalization feed

pub mod connector;
pub mod parser;
pub mod types;

pub use connector::{HOSPITALIZATION_ID, HospitalizationConnector, reconcile};
pub use parser::parse_hospitalization_csv;
pub use types::{HospitalizationFigures, HospitalizationPayload};
