//! Survey-text classifiers. Each one is total: malformed or missing input
//! maps to the `Unknown` tag of its enumeration.

use crate::columns::{self, ALL_OF_THE_ABOVE, NOT_CONNECTED_REASONS};
use crate::extract;
use crate::types::{
    CellValue, ConnectionBucket, Connectivity, DownloadBucket, QualityBucket, RawRecord, Reason,
    ReasonBucket,
};
use std::collections::BTreeSet;

const RED_MARKERS: [&str; 4] = ["less than 1", "between 1-5", "1-5", "less than 5"];
const ORANGE_MARKERS: [&str; 4] = ["between 5-20", "5-20", "between 20-40", "20-40"];
const GREEN_MARKERS: [&str; 4] = ["between 40-100", "40-100", "more than 100", ">100"];

const NO_REASON: [&str; 7] = ["na", "n/a", "none", "null", "0", "false", "no"];

pub fn download_bucket(props: &RawRecord) -> DownloadBucket {
    let text = props
        .text(columns::DOWNLOAD_SPEED)
        .to_lowercase()
        .replace(['\u{2013}', '\u{2014}'], "-");

    let contains_any = |markers: &[&str]| markers.iter().any(|m| text.contains(m));

    if contains_any(&RED_MARKERS) {
        DownloadBucket::Red
    } else if contains_any(&ORANGE_MARKERS) {
        DownloadBucket::Orange
    } else if contains_any(&GREEN_MARKERS) {
        DownloadBucket::Green
    } else {
        DownloadBucket::Unknown
    }
}

/// Lowercased tokens of the connection-type answer, including any
/// `"<option>:<question>"` compound columns for the same question.
pub fn connection_tokens(props: &RawRecord) -> Vec<String> {
    let suffix = format!(":{}", columns::CONNECTION_TYPE);
    let mut raw = vec![props.text(columns::CONNECTION_TYPE)];

    let mut compound: Vec<(&String, &CellValue)> = props
        .iter()
        .filter(|(key, value)| key.ends_with(&suffix) && !value.is_empty())
        .collect();
    compound.sort_by(|a, b| a.0.cmp(b.0));
    raw.extend(compound.into_iter().map(|(_, value)| value.to_string()));

    raw.iter()
        .flat_map(|text| text.split(|c: char| matches!(c, ',' | ';' | '/' | '|')))
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

pub fn connection_token_bucket(token: &str) -> ConnectionBucket {
    let has = |needles: &[&str]| needles.iter().any(|n| token.contains(n));

    if matches!(token, "" | "unknown" | "n/a" | "na" | "none") {
        ConnectionBucket::Unknown
    } else if has(&["optic", "fiber", "fibre"]) {
        ConnectionBucket::OpticFiber
    } else if has(&["dsl", "adsl", "vdsl"]) {
        ConnectionBucket::Dsl
    } else if has(&["satellite", "sat"]) {
        ConnectionBucket::Satellite
    } else if has(&["cable", "coax"]) {
        ConnectionBucket::Cable
    } else if has(&["mobile", "cell", "3g", "4g", "5g", "lte"]) {
        ConnectionBucket::MobileData
    } else {
        ConnectionBucket::Other
    }
}

/// Distinct buckets across all tokens. A row with no tokens yields `{Unknown}`.
pub fn connection_buckets(props: &RawRecord) -> BTreeSet<ConnectionBucket> {
    let buckets: BTreeSet<_> = connection_tokens(props)
        .iter()
        .map(|token| connection_token_bucket(token))
        .collect();
    if buckets.is_empty() {
        BTreeSet::from([ConnectionBucket::Unknown])
    } else {
        buckets
    }
}

/// Highest-priority bucket of a set; the enum's ordering is the priority.
pub fn primary_connection_bucket(buckets: &BTreeSet<ConnectionBucket>) -> ConnectionBucket {
    buckets.first().copied().unwrap_or(ConnectionBucket::Unknown)
}

pub fn connection_bucket(props: &RawRecord) -> ConnectionBucket {
    primary_connection_bucket(&connection_buckets(props))
}

fn has_reason(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    !value.is_empty() && !NO_REASON.contains(&value.as_str())
}

fn all_of_the_above(props: &RawRecord) -> bool {
    has_reason(&NOT_CONNECTED_REASONS.value(props, ALL_OF_THE_ABOVE))
}

fn flagged_reasons(props: &RawRecord) -> BTreeSet<Reason> {
    NOT_CONNECTED_REASONS
        .options
        .iter()
        .filter(|(_, label)| has_reason(&NOT_CONNECTED_REASONS.value(props, label)))
        .map(|(reason, _)| *reason)
        .collect()
}

/// Individual reasons counted in stats. "All of the above" expands to every
/// reason; connected or unknown libraries contribute none.
pub fn counted_reasons(props: &RawRecord) -> BTreeSet<Reason> {
    if extract::connectivity(props) != Connectivity::No {
        return BTreeSet::new();
    }
    if all_of_the_above(props) {
        return Reason::ALL.into_iter().collect();
    }
    flagged_reasons(props)
}

/// Point-level reason tag. Collapses "All of the above" and multiple
/// reasons into `Multi`.
pub fn reason_bucket(props: &RawRecord) -> ReasonBucket {
    if extract::connectivity(props) != Connectivity::No {
        return ReasonBucket::Unknown;
    }
    if all_of_the_above(props) {
        return ReasonBucket::Multi;
    }
    let reasons = flagged_reasons(props);
    match reasons.len() {
        0 => ReasonBucket::Unknown,
        1 => reasons
            .first()
            .map(|reason| ReasonBucket::from(*reason))
            .unwrap_or(ReasonBucket::Unknown),
        _ => ReasonBucket::Multi,
    }
}

fn quality_score(props: &RawRecord) -> Option<f64> {
    match props.get(columns::PERCEIVED_QUALITY)? {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        CellValue::Empty => None,
    }
}

pub fn quality_bucket_for(score: f64) -> QualityBucket {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        QualityBucket::Unknown
    } else if score < 20.0 {
        QualityBucket::VeryPoor
    } else if score < 50.0 {
        QualityBucket::Poor
    } else if score < 60.0 {
        QualityBucket::Fair
    } else if score < 80.0 {
        QualityBucket::Good
    } else {
        QualityBucket::Excellent
    }
}

pub fn perceived_quality_bucket(props: &RawRecord) -> QualityBucket {
    quality_score(props)
        .map(quality_bucket_for)
        .unwrap_or(QualityBucket::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(key: &str, value: &str) -> RawRecord {
        let mut record = RawRecord::new();
        record.insert(key, CellValue::from_raw(value));
        record
    }

    fn disconnected(reasons: &[(&str, &str)]) -> RawRecord {
        let mut record = with(columns::INTERNET_ACCESS, "No");
        for (label, value) in reasons {
            record.insert(NOT_CONNECTED_REASONS.column(label), CellValue::from_raw(value));
        }
        record
    }

    #[test]
    fn download_rules_apply_in_order() {
        let cases = [
            ("less than 1 Mbps", DownloadBucket::Red),
            ("Between 1–5 Mbps", DownloadBucket::Red),
            ("Between 5-20 Mbps", DownloadBucket::Orange),
            ("Between 20—40 Mbps", DownloadBucket::Orange),
            ("Between 40-100 Mbps", DownloadBucket::Green),
            ("More than 100 Mbps", DownloadBucket::Green),
            ("I don't know", DownloadBucket::Unknown),
            ("", DownloadBucket::Unknown),
        ];
        for (text, expected) in cases {
            assert_eq!(download_bucket(&with(columns::DOWNLOAD_SPEED, text)), expected, "{text}");
        }
        assert_eq!(download_bucket(&RawRecord::new()), DownloadBucket::Unknown);
    }

    #[test]
    fn connection_tokens_split_on_separators() {
        let props = with(columns::CONNECTION_TYPE, "Fiber optic; DSL / | Satellite,,");
        assert_eq!(connection_tokens(&props), vec!["fiber optic", "dsl", "satellite"]);
    }

    #[test]
    fn connection_primary_uses_priority() {
        let props = with(columns::CONNECTION_TYPE, "Fiber optic, Mobile (4G)");
        let buckets = connection_buckets(&props);
        assert_eq!(
            buckets,
            BTreeSet::from([ConnectionBucket::OpticFiber, ConnectionBucket::MobileData])
        );
        assert_eq!(connection_bucket(&props), ConnectionBucket::OpticFiber);

        let props = with(columns::CONNECTION_TYPE, "Satellite / coaxial cable");
        assert_eq!(connection_bucket(&props), ConnectionBucket::Cable);
    }

    #[test]
    fn connection_token_fallbacks() {
        assert_eq!(connection_token_bucket("n/a"), ConnectionBucket::Unknown);
        assert_eq!(connection_token_bucket("other"), ConnectionBucket::Other);
        assert_eq!(connection_token_bucket("radio link"), ConnectionBucket::Other);
        assert_eq!(connection_token_bucket("lte router"), ConnectionBucket::MobileData);
        assert_eq!(connection_token_bucket("vdsl2"), ConnectionBucket::Dsl);
    }

    #[test]
    fn empty_connection_counts_as_unknown() {
        assert_eq!(
            connection_buckets(&RawRecord::new()),
            BTreeSet::from([ConnectionBucket::Unknown])
        );
        assert_eq!(connection_bucket(&with(columns::CONNECTION_TYPE, " , ")), ConnectionBucket::Unknown);
    }

    #[test]
    fn compound_connection_columns_contribute_tokens() {
        let mut props = RawRecord::new();
        props.insert(
            format!("Cable:{}", columns::CONNECTION_TYPE),
            CellValue::Text("Cable".into()),
        );
        props.insert(
            format!("DSL:{}", columns::CONNECTION_TYPE),
            CellValue::Text("DSL".into()),
        );
        assert_eq!(
            connection_buckets(&props),
            BTreeSet::from([ConnectionBucket::Cable, ConnectionBucket::Dsl])
        );
    }

    #[test]
    fn reasons_only_apply_to_disconnected_libraries() {
        let mut props = disconnected(&[("High cost", "too expensive")]);
        assert_eq!(reason_bucket(&props), ReasonBucket::HighCost);
        props.insert(columns::INTERNET_ACCESS, CellValue::Text("Yes".into()));
        assert_eq!(reason_bucket(&props), ReasonBucket::Unknown);
        assert!(counted_reasons(&props).is_empty());
    }

    #[test]
    fn placeholder_answers_are_not_reasons() {
        let props = disconnected(&[("High cost", "N/A"), ("Electrical supply issues", "0"), ("Policy/Regulatory barriers", "no")]);
        assert_eq!(reason_bucket(&props), ReasonBucket::Unknown);
        assert!(counted_reasons(&props).is_empty());
    }

    #[test]
    fn several_reasons_collapse_to_multi_but_count_individually() {
        let props = disconnected(&[
            ("Infrastructure limitations", "Infrastructure limitations"),
            ("Digital literacy gaps", "Digital literacy gaps"),
        ]);
        assert_eq!(reason_bucket(&props), ReasonBucket::Multi);
        assert_eq!(
            counted_reasons(&props),
            BTreeSet::from([Reason::Infrastructure, Reason::DigitalLiteracy])
        );
    }

    #[test]
    fn all_of_the_above_expands_to_every_reason() {
        let props = disconnected(&[(ALL_OF_THE_ABOVE, "All of the above")]);
        assert_eq!(reason_bucket(&props), ReasonBucket::Multi);
        assert_eq!(counted_reasons(&props), Reason::ALL.into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn quality_ranges_are_inclusive() {
        let cases = [
            ("0", QualityBucket::VeryPoor),
            ("19", QualityBucket::VeryPoor),
            ("20", QualityBucket::Poor),
            ("49", QualityBucket::Poor),
            ("50", QualityBucket::Fair),
            ("59", QualityBucket::Fair),
            ("60", QualityBucket::Good),
            ("79", QualityBucket::Good),
            ("80", QualityBucket::Excellent),
            ("85", QualityBucket::Excellent),
            ("100", QualityBucket::Excellent),
            ("72,5", QualityBucket::Good),
            ("101", QualityBucket::Unknown),
            ("-1", QualityBucket::Unknown),
            ("N/A", QualityBucket::Unknown),
            ("great", QualityBucket::Unknown),
            ("", QualityBucket::Unknown),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                perceived_quality_bucket(&with(columns::PERCEIVED_QUALITY, raw)),
                expected,
                "{raw}"
            );
        }
    }
}
