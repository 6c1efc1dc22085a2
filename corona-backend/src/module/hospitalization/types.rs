///! Hospitalization report types

use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct HospitalizationRow {
    #[serde(rename = "Datum")]
    pub date: String,
    #[serde(rename = "Bundesland", default)]
    pub state_name: String,
    #[serde(rename = "Bundesland_Id")]
    pub state_id: String,
    #[serde(rename = "Altersgruppe")]
    pub age_group: String,
    #[serde(rename = "7T_Hospitalisierung_Faelle", default)]
    pub cases: String,
    #[serde(rename = "7T_Hospitalisierung_Inzidenz", default)]
    pub incidence: String,
}

/// All-ages figures of one state (or the country) on the report day
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalizationFigures {
    pub state_id: u32,
    pub name: String,
    pub cases: Option<i64>,
    pub incidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HospitalizationPayload {
    pub as_of: NaiveDate,
    pub rows: Vec<HospitalizationFigures>,
}

impl HospitalizationPayload {
    pub fn row(&self, state_id: u32) -> Option<&HospitalizationFigures> {
        self.rows.iter().find(|r| r.state_id == state_id)
    }
}
