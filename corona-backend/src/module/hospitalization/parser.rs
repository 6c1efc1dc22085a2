///! Hospitalization CSV parser
///!
///! The report holds one row per day, state and age group going back to
///! 2020; only the all-ages rows of the most recent day are kept.

use crate::dates::parse_iso_date;
use crate::error::{EngineError, Result};
use crate::module::report::{parse_float, parse_int, reader, require_columns};

use super::types::{HospitalizationFigures, HospitalizationPayload, HospitalizationRow};

pub const FEED: &str = "hospitalization";

/// Age group covering the whole population
pub const ALL_AGES: &str = "00+";

const COLUMNS: [&str; 6] = [
    "Datum",
    "Bundesland",
    "Bundesland_Id",
    "Altersgruppe",
    "7T_Hospitalisierung_Faelle",
    "7T_Hospitalisierung_Inzidenz",
];

pub fn parse_hospitalization_csv(text: &str) -> Result<HospitalizationPayload> {
    let mut rdr = reader(text);
    let headers = rdr.headers().map_err(|e| EngineError::parse(FEED, e))?.clone();
    require_columns(FEED, &headers, &COLUMNS)?;

    let mut dated = Vec::new();
    for (index, result) in rdr.deserialize::<HospitalizationRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!("Skipping hospitalization row {}: {}", index + 1, e);
                continue;
            }
        };
        if row.age_group != ALL_AGES {
            continue;
        }
        let Some(date) = parse_iso_date(&row.date) else {
            continue;
        };
        let Some(state_id) = parse_int(&row.state_id).and_then(|id| u32::try_from(id).ok()) else {
            continue;
        };
        dated.push((
            date,
            HospitalizationFigures {
                state_id,
                name: row.state_name.trim().to_string(),
                cases: parse_int(&row.cases),
                incidence: parse_float(&row.incidence),
            },
        ));
    }

    let as_of = dated
        .iter()
        .map(|(date, _)| *date)
        .max()
        .ok_or_else(|| EngineError::parse(FEED, "report contains no all-ages rows"))?;

    let rows = dated
        .into_iter()
        .filter(|(date, _)| *date == as_of)
        .map(|(_, figures)| figures)
        .collect();

    Ok(HospitalizationPayload { as_of, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Datum,Bundesland,Bundesland_Id,Altersgruppe,7T_Hospitalisierung_Faelle,7T_Hospitalisierung_Inzidenz";

    #[test]
    fn test_filters_day_and_age_group() {
        let csv = format!(
            "{}\n2021-10-18,Bundesgebiet,00,00+,1234,1.48\n\
             2021-10-18,Bundesgebiet,00,60+,700,2.9\n\
             2021-10-18,Bayern,09,00+,300,2.28\n\
             2021-10-17,Bayern,09,00+,290,2.21\n",
            HEADER
        );
        let payload = parse_hospitalization_csv(&csv).unwrap();
        assert_eq!(payload.as_of, NaiveDate::from_ymd_opt(2021, 10, 18).unwrap());
        assert_eq!(payload.rows.len(), 2);
        assert_eq!(payload.row(0).unwrap().cases, Some(1234));
        assert_eq!(payload.row(9).unwrap().incidence, Some(2.28));
    }

    #[test]
    fn test_missing_column() {
        let csv = "Datum,Bundesland,Bundesland_Id,Altersgruppe\n2021-10-18,Bayern,09,00+\n";
        let err = parse_hospitalization_csv(csv).unwrap_err();
        assert!(err.to_string().contains("7T_Hospitalisierung_Faelle"));
    }
}
