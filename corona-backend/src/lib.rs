//! Corona feed backend
//!
//! Reconciles the public-health feeds into one cached document and keeps it
//! persisted with a backup of the previous version.

pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod module;
pub mod trend;
