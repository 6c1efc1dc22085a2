///! R value report types

use chrono::NaiveDate;
use serde::Deserialize;

/// Raw CSV row; values stay text so blanks can be skipped
#[derive(Debug, Deserialize)]
pub struct RValueRow {
    #[serde(rename = "Datum")]
    pub date: String,
    #[serde(rename = "PS_7_Tage_R_Wert", default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Most recent valid estimates, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct RValuePayload {
    pub points: Vec<RValuePoint>,
}

impl RValuePayload {
    pub fn latest(&self) -> Option<&RValuePoint> {
        self.points.last()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}
