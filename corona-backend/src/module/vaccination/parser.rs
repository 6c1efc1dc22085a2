///! Vaccination quota CSV parser

use crate::dates::parse_iso_date;
use crate::error::{EngineError, Result};
use crate::module::report::{parse_float, parse_int, reader, require_columns};

use super::types::{VaccinationFigures, VaccinationPayload, VaccinationRow};

pub const FEED: &str = "vaccination";

const COLUMNS: [&str; 7] = [
    "Datum",
    "Bundesland",
    "BundeslandId_Impfort",
    "Impfungen_gesamt_min1",
    "Impfquote_gesamt_min1",
    "Impfquote_gesamt_gi",
    "Impfquote_gesamt_boost1",
];

/// Parse the report and keep the rows of its most recent day.
pub fn parse_vaccination_csv(text: &str) -> Result<VaccinationPayload> {
    let mut rdr = reader(text);
    let headers = rdr.headers().map_err(|e| EngineError::parse(FEED, e))?.clone();
    require_columns(FEED, &headers, &COLUMNS)?;

    let mut dated = Vec::new();
    for (index, result) in rdr.deserialize::<VaccinationRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!("Skipping vaccination row {}: {}", index + 1, e);
                continue;
            }
        };
        let Some(date) = parse_iso_date(&row.date) else {
            continue;
        };
        let Some(state_id) = parse_int(&row.state_id).and_then(|id| u32::try_from(id).ok()) else {
            continue;
        };
        dated.push((
            date,
            VaccinationFigures {
                state_id,
                name: row.state_name.trim().to_string(),
                cumulated: parse_int(&row.vaccinated),
                quote: parse_float(&row.quote),
                quote_fully_vaccinated: parse_float(&row.quote_fully_vaccinated),
                quote_booster: parse_float(&row.quote_booster),
            },
        ));
    }

    let as_of = dated
        .iter()
        .map(|(date, _)| *date)
        .max()
        .ok_or_else(|| EngineError::parse(FEED, "report contains no dated rows"))?;

    let rows = dated
        .into_iter()
        .filter(|(date, _)| *date == as_of)
        .map(|(_, figures)| figures)
        .collect();

    Ok(VaccinationPayload { as_of, rows })
}
