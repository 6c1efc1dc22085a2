///! Incidence feed JSON parser

use crate::dates::parse_german_date;
use crate::error::{EngineError, Result};

use super::types::{IncidencePayload, IncidenceResponse};

pub const FEED: &str = "incidence";

/// Decode the feature service response and determine its as-of date.
pub fn parse_incidence_json(json: &str) -> Result<IncidencePayload> {
    let response: IncidenceResponse =
        serde_json::from_str(json).map_err(|e| EngineError::parse(FEED, e))?;

    if response.features.is_empty() {
        return Err(EngineError::parse(FEED, "response contains no districts"));
    }

    let districts: Vec<_> = response.features.into_iter().map(|f| f.attributes).collect();

    let as_of = districts
        .iter()
        .filter_map(|d| parse_german_date(&d.last_update))
        .max()
        .ok_or_else(|| EngineError::parse(FEED, "no district carries a parsable update date"))?;

    Ok(IncidencePayload { as_of, districts })
}
