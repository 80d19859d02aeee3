//! Per-library summary shown in the details panel.

use crate::columns::{self, MultiSelect, DEVICES_USED, DIGITAL_RESOURCES, TARGET_AUDIENCE};
use crate::types::{GeoPoint, RawRecord, Tags};
use serde::Serialize;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDetails {
    pub name: String,
    pub library_type: String,
    pub staff: String,
    pub main_target: String,
    pub availability: String,
    pub devices_available: String,
    pub devices_used: String,
    pub users: String,
    pub digital_types: String,
    pub digital_available: String,
    pub remote_access: String,
}

fn or_na(value: String) -> String {
    if value.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value
    }
}

fn join_or_na(items: Vec<String>) -> String {
    or_na(items.join(", "))
}

fn library_type(p: &RawRecord) -> String {
    let raw = p.text(columns::LIBRARY_TYPE);
    if raw.eq_ignore_ascii_case("other") {
        let specified = p.text(columns::LIBRARY_TYPE_OTHER);
        return if specified.is_empty() { "OTHER".to_string() } else { specified };
    }
    if raw.is_empty() {
        "PUBLIC LIBRARY".to_string()
    } else {
        raw
    }
}

fn availability(p: &RawRecord) -> String {
    let raw = p.text(columns::AVAILABILITY);
    let low = raw.to_lowercase();
    if low.contains("all day") && low.contains("all times") {
        "All day".to_string()
    } else {
        or_na(raw)
    }
}

fn devices_available(p: &RawRecord) -> String {
    let raw = p.text(columns::DEVICES_AVAILABLE);
    if raw == "More than 20 (specify)" {
        let specified = p.text(columns::DEVICES_AVAILABLE_MORE);
        return if specified.is_empty() { "More than 20".to_string() } else { specified };
    }
    or_na(raw)
}

/// Option labels, with "other" options replaced by what was written in them.
fn labels_with_written_other(question: &MultiSelect<()>, p: &RawRecord) -> Vec<String> {
    question
        .selected(p)
        .map(|(_, label, value)| {
            if label.to_lowercase().contains("other") {
                value
            } else {
                label.to_string()
            }
        })
        .collect()
}

fn main_target(p: &RawRecord) -> String {
    let words = TARGET_AUDIENCE
        .selected(p)
        .filter_map(|(_, label, _)| label.split_whitespace().next().map(str::to_string))
        .collect();
    join_or_na(words)
}

impl LibraryDetails {
    pub fn from_record(p: &RawRecord) -> Self {
        let name = columns::NAME_KEYS
            .iter()
            .map(|key| p.text(key))
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| "Unknown library".to_string());

        LibraryDetails {
            name,
            library_type: library_type(p),
            staff: or_na(p.text(columns::STAFF)),
            main_target: main_target(p),
            availability: availability(p),
            devices_available: devices_available(p),
            devices_used: join_or_na(labels_with_written_other(&DEVICES_USED, p)),
            users: or_na(p.text(columns::DAILY_USERS)),
            digital_types: join_or_na(labels_with_written_other(&DIGITAL_RESOURCES, p)),
            digital_available: or_na(p.text(columns::DIGITAL_AVAILABLE)),
            remote_access: or_na(p.text(columns::REMOTE_ACCESS)),
        }
    }
}

/// What the API returns for a single library.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryView {
    pub id: usize,
    pub coordinates: [f64; 2],
    pub details: LibraryDetails,
    pub tags: Tags,
}

impl LibraryView {
    pub fn new(point: &GeoPoint) -> Self {
        LibraryView {
            id: point.id,
            coordinates: [point.lon(), point.lat()],
            details: LibraryDetails::from_record(&point.properties),
            tags: point.tags.clone(),
        }
    }
}
