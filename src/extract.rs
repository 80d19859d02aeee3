use crate::columns;
use crate::types::{CellValue, Connectivity, RawRecord};

/// First non-empty country-like column, trimmed. No fuzzy matching.
pub fn extract_country(props: &RawRecord) -> String {
    columns::COUNTRY_KEYS
        .iter()
        .map(|key| props.text(key))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// `(lon, lat)` when both cells coerce to finite numbers.
pub fn extract_coordinates(row: &RawRecord) -> Option<(f64, f64)> {
    let lat = coerce_finite(row.get(columns::LAT)?)?;
    let lon = coerce_finite(row.get(columns::LON)?)?;
    Some((lon, lat))
}

fn coerce_finite(value: &CellValue) -> Option<f64> {
    value.as_number().filter(|n| n.is_finite())
}

/// Whether any connectivity-looking column carries a real answer.
pub fn has_connectivity_info(props: &RawRecord) -> bool {
    props.iter().any(|(key, value)| {
        let key = key.to_lowercase();
        let relevant = ["connect", "connectivity", "status", "wifi"]
            .iter()
            .any(|needle| key.contains(needle));
        if !relevant {
            return false;
        }
        let value = value.to_string();
        let value = value.trim().to_lowercase();
        !value.is_empty() && value != "na" && value != "n/a"
    })
}

pub fn connectivity(props: &RawRecord) -> Connectivity {
    match props.text(columns::INTERNET_ACCESS).to_lowercase().as_str() {
        "yes" => Connectivity::Yes,
        "no" => Connectivity::No,
        _ => Connectivity::Unknown,
    }
}

/// A library "has data" when it has a name or an address.
pub fn has_data(props: &RawRecord) -> bool {
    props.is_present("name") || props.is_present("address")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, CellValue)]) -> RawRecord {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn country_follows_priority_list() {
        let props = record(&[
            ("Country", CellValue::Text("France".into())),
            ("país", CellValue::Text("España".into())),
        ]);
        assert_eq!(extract_country(&props), "France");

        let props = record(&[
            ("country", CellValue::Text("   ".into())),
            ("País", CellValue::Text(" México ".into())),
        ]);
        assert_eq!(extract_country(&props), "México");

        assert_eq!(extract_country(&RawRecord::new()), "");
    }

    #[test]
    fn coordinates_require_finite_values() {
        let ok = record(&[("lat", CellValue::Number(41.39)), ("lon", CellValue::Text("2.16".into()))]);
        assert_eq!(extract_coordinates(&ok), Some((2.16, 41.39)));

        let blank = record(&[("lat", CellValue::Number(41.39)), ("lon", CellValue::Empty)]);
        assert_eq!(extract_coordinates(&blank), None);

        let text = record(&[("lat", CellValue::Text("north".into())), ("lon", CellValue::Number(2.0))]);
        assert_eq!(extract_coordinates(&text), None);

        let infinite = record(&[("lat", CellValue::Text("inf".into())), ("lon", CellValue::Number(2.0))]);
        assert_eq!(extract_coordinates(&infinite), None);

        let missing = record(&[("lat", CellValue::Number(1.0))]);
        assert_eq!(extract_coordinates(&missing), None);
    }

    #[test]
    fn connectivity_info_ignores_na_answers() {
        let na = record(&[("Wifi status", CellValue::Text("N/A".into()))]);
        assert!(!has_connectivity_info(&na));

        let unrelated = record(&[("Library name", CellValue::Text("Central".into()))]);
        assert!(!has_connectivity_info(&unrelated));

        let answered = record(&[(columns::CONNECTION_TYPE, CellValue::Text("DSL".into()))]);
        assert!(has_connectivity_info(&answered));
    }

    #[test]
    fn connectivity_flag_is_case_insensitive() {
        let yes = record(&[(columns::INTERNET_ACCESS, CellValue::Text(" YES ".into()))]);
        assert_eq!(connectivity(&yes), Connectivity::Yes);
        let maybe = record(&[(columns::INTERNET_ACCESS, CellValue::Text("Sometimes".into()))]);
        assert_eq!(connectivity(&maybe), Connectivity::Unknown);
        assert_eq!(connectivity(&RawRecord::new()), Connectivity::Unknown);
    }
}
