///! The 16 German federal states

/// (id, name) in official key order
pub const FEDERAL_STATES: [(u32, &str); 16] = [
    (1, "Schleswig-Holstein"),
    (2, "Hamburg"),
    (3, "Niedersachsen"),
    (4, "Bremen"),
    (5, "Nordrhein-Westfalen"),
    (6, "Hessen"),
    (7, "Rheinland-Pfalz"),
    (8, "Baden-Württemberg"),
    (9, "Bayern"),
    (10, "Saarland"),
    (11, "Berlin"),
    (12, "Brandenburg"),
    (13, "Mecklenburg-Vorpommern"),
    (14, "Sachsen"),
    (15, "Sachsen-Anhalt"),
    (16, "Thüringen"),
];

/// Id of the national row in the CSV reports
pub const NATIONAL_ID: u32 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_table_is_in_key_order() {
        for (index, (id, name)) in FEDERAL_STATES.iter().enumerate() {
            assert_eq!(*id as usize, index + 1);
            assert!(!name.is_empty());
        }
        assert!(FEDERAL_STATES.iter().all(|(id, _)| *id != NATIONAL_ID));
    }
}
