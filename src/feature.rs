use crate::classify;
use crate::columns;
use crate::extract;
use crate::types::{CellValue, GeoPoint, RawRecord, Tags};
use geo::{BoundingRect, MultiPoint, Point, Rect};
use geojson::feature::Id;
use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// Turns one source row into a library point, or `None` when its
/// coordinates are unusable. `index` is the row's position in the source
/// and becomes the point's stable id.
pub fn build_feature(row: &RawRecord, index: usize) -> Option<GeoPoint> {
    let (lon, lat) = extract::extract_coordinates(row)?;

    let mut properties = row.clone();
    properties.remove(columns::LAT);
    properties.remove(columns::LON);

    let connection_buckets = classify::connection_buckets(&properties);
    let tags = Tags {
        country: extract::extract_country(&properties),
        connectivity: extract::connectivity(&properties),
        has_connectivity_info: extract::has_connectivity_info(&properties),
        download_bucket: classify::download_bucket(&properties),
        connection_bucket: classify::primary_connection_bucket(&connection_buckets),
        connection_buckets,
        reason_bucket: classify::reason_bucket(&properties),
        reasons: classify::counted_reasons(&properties),
        perceived_quality_bucket: classify::perceived_quality_bucket(&properties),
        has_data: extract::has_data(&properties),
    };

    Some(GeoPoint {
        id: index,
        point: Point::new(lon, lat),
        properties,
        tags,
    })
}

/// All library points of one load, in source order.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<GeoPoint>,
    /// Distinct non-empty country tags, first-seen order.
    pub countries: Vec<String>,
    pub rows_read: usize,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Points are kept in ascending id order.
    pub fn get(&self, id: usize) -> Option<&GeoPoint> {
        self.features
            .binary_search_by_key(&id, |f| f.id)
            .ok()
            .map(|pos| &self.features[pos])
    }

    pub fn rows_dropped(&self) -> usize {
        self.rows_read.saturating_sub(self.features.len())
    }
}

pub fn build_collection(rows: &[RawRecord]) -> FeatureCollection {
    let features: Vec<GeoPoint> = rows
        .par_iter()
        .enumerate()
        .filter_map(|(index, row)| build_feature(row, index))
        .collect();

    let mut seen = HashSet::new();
    let countries = features
        .iter()
        .map(|f| f.tags.country.as_str())
        .filter(|c| !c.is_empty() && seen.insert(*c))
        .map(str::to_string)
        .collect();

    let collection = FeatureCollection {
        features,
        countries,
        rows_read: rows.len(),
    };
    debug!(
        "Built {} features, dropped {} rows without coordinates",
        collection.len(),
        collection.rows_dropped()
    );
    collection
}

/// Bounding box of the given points, `None` when there are none.
pub fn extent<'a>(features: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Rect<f64>> {
    let points: MultiPoint<f64> = features.into_iter().map(|f| f.point).collect();
    points.bounding_rect()
}

fn cell_to_json(value: &CellValue) -> JsonValue {
    match value {
        CellValue::Text(s) => JsonValue::String(s.clone()),
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CellValue::Empty => JsonValue::Null,
    }
}

/// GeoJSON rendition of one point: original answers plus `__`-prefixed tags.
pub fn to_geojson_feature(point: &GeoPoint) -> Feature {
    let mut properties: JsonObject = point
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), cell_to_json(v)))
        .collect();

    let tags = &point.tags;
    properties.insert("__country".into(), JsonValue::String(tags.country.clone()));
    properties.insert("__dlBucket".into(), tags.download_bucket.as_str().into());
    properties.insert("__connectionBucket".into(), tags.connection_bucket.as_str().into());
    properties.insert("__reasonBucket".into(), tags.reason_bucket.as_str().into());
    properties.insert("__qualityBucket".into(), tags.perceived_quality_bucket.as_str().into());
    properties.insert("__connectivity".into(), tags.connectivity.as_str().into());
    properties.insert("hasData".into(), JsonValue::Bool(tags.has_data));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![point.lon(), point.lat()]))),
        id: Some(Id::Number(serde_json::Number::from(point.id))),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn to_geojson<'a>(features: impl IntoIterator<Item = &'a GeoPoint>) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: features.into_iter().map(to_geojson_feature).collect(),
        foreign_members: None,
    }
}
