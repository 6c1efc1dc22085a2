///! Reproduction number (R value) feed

pub mod connector;
pub mod parser;
pub mod types;

pub use connector::{RVALUE_ID, RValueConnector, reconcile};
pub use parser::parse_rvalue_csv;
pub use types::{RValuePayload, RValuePoint};
