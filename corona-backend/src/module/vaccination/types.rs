///! Vaccination report types

use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct VaccinationRow {
    #[serde(rename = "Datum")]
    pub date: String,
    #[serde(rename = "Bundesland", default)]
    pub state_name: String,
    #[serde(rename = "BundeslandId_Impfort")]
    pub state_id: String,
    #[serde(rename = "Impfungen_gesamt_min1", default)]
    pub vaccinated: String,
    #[serde(rename = "Impfquote_gesamt_min1", default)]
    pub quote: String,
    #[serde(rename = "Impfquote_gesamt_gi", default)]
    pub quote_fully_vaccinated: String,
    #[serde(rename = "Impfquote_gesamt_boost1", default)]
    pub quote_booster: String,
}

/// One row of the report day; `None` marks a blank or unreadable cell
#[derive(Debug, Clone, PartialEq)]
pub struct VaccinationFigures {
    /// 0 for the national row, 1-16 for the states
    pub state_id: u32,
    pub name: String,
    pub cumulated: Option<i64>,
    pub quote: Option<f64>,
    pub quote_fully_vaccinated: Option<f64>,
    pub quote_booster: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VaccinationPayload {
    pub as_of: NaiveDate,
    pub rows: Vec<VaccinationFigures>,
}

impl VaccinationPayload {
    pub fn row(&self, state_id: u32) -> Option<&VaccinationFigures> {
        self.rows.iter().find(|r| r.state_id == state_id)
    }
}
