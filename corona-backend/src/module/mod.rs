///! Feed connectors, the state store and the update orchestrator

pub mod connector;
pub mod feed;
pub mod hospitalization;
pub mod incidence;
pub mod plausibility;
pub mod query;
pub mod report;
pub mod rollback;
pub mod rvalue;
pub mod scheduled;
pub mod states;
pub mod store;
pub mod vaccination;
