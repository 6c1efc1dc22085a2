///! Incidence feed payload types

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct IncidenceResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    pub attributes: DistrictAttributes,
}

/// Attributes of one district as delivered by the feature service.
///
/// Numbers are optional so that a missing figure fails validation for that
/// district instead of failing the whole JSON decode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DistrictAttributes {
    #[serde(rename = "OBJECTID")]
    pub object_id: u32,
    #[serde(rename = "GEN", default)]
    pub name: String,
    #[serde(rename = "BEZ", default)]
    pub kind: String,
    #[serde(rename = "EWZ")]
    pub population: Option<i64>,
    #[serde(rename = "EWZ_BL")]
    pub state_population: Option<i64>,
    pub cases: Option<i64>,
    pub deaths: Option<i64>,
    pub cases_per_100k: Option<f64>,
    #[serde(rename = "BL", default)]
    pub state_name: String,
    #[serde(rename = "BL_ID", default, deserialize_with = "string_or_number")]
    pub state_id: String,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(rename = "cases7_per_100k")]
    pub incidence_7d: Option<f64>,
    #[serde(rename = "cases7_bl_per_100k")]
    pub state_incidence_7d: Option<f64>,
}

/// Parsed incidence snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct IncidencePayload {
    /// Most recent `last_update` day over all districts
    pub as_of: NaiveDate,
    pub districts: Vec<DistrictAttributes>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(n) => n.to_string(),
    })
}
