use crate::error::LoadError;
use crate::feature::{self, FeatureCollection};
use crate::stats::{compute_stats, Stats};
use crate::types::GeoPoint;
use geo::algorithm::contains::Contains;
use geo::{BoundingRect, Geometry, MultiPolygon, Point, Rect};
use geojson::{GeoJson, JsonObject};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Serialize;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

pub const WORLDWIDE: &str = "Worldwide";

const BOUNDARY_NAME_KEYS: [&str; 4] = ["name", "ADMIN", "ISO3166-1-Alpha-2", "ISO3166-1-Alpha-3"];

/// NFD, combining marks stripped, lowercased, trimmed: "País" == "pais".
pub fn normalize_name(s: &str) -> String {
    s.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// A country polygon, indexed by its bounding box.
#[derive(Debug, Clone)]
struct CountryRegion {
    name: String,
    shape: MultiPolygon<f64>,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountryRegion {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn as_multi_polygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Some(multi),
        _ => None,
    }
}

/// Normalized country name (or ISO code) to boundary bounding box, plus the
/// polygons themselves for point-in-country lookups.
#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    boxes: HashMap<String, Rect<f64>>,
    regions: RTree<CountryRegion>,
}

impl BoundaryIndex {
    pub fn from_geojson(geojson: GeoJson) -> Result<Self, LoadError> {
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(LoadError::NotFeatureCollection("boundary data")),
        };

        let mut index = BoundaryIndex::default();
        let mut regions = Vec::new();
        for feature in collection.features {
            let Some(geometry) = feature.geometry else { continue };
            let geometry: Geometry<f64> = match geometry.value.try_into() {
                Ok(g) => g,
                Err(_) => continue,
            };
            let Some(rect) = geometry.bounding_rect() else { continue };
            let Some(props) = &feature.properties else { continue };
            index.insert_names(props, rect);

            let name = ["name", "ADMIN"]
                .iter()
                .filter_map(|key| props.get(*key).and_then(|v| v.as_str()))
                .map(str::trim)
                .find(|name| !name.is_empty());
            if let (Some(name), Some(shape)) = (name, as_multi_polygon(geometry)) {
                regions.push(CountryRegion {
                    name: name.to_string(),
                    shape,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                });
            }
        }
        index.regions = RTree::bulk_load(regions);
        Ok(index)
    }

    fn insert_names(&mut self, props: &JsonObject, rect: Rect<f64>) {
        for key in BOUNDARY_NAME_KEYS {
            if let Some(name) = props.get(key).and_then(|v| v.as_str()) {
                let name = normalize_name(name);
                if !name.is_empty() {
                    self.boxes.insert(name, rect);
                }
            }
        }
    }

    pub fn insert(&mut self, name: &str, rect: Rect<f64>) {
        self.boxes.insert(normalize_name(name), rect);
    }

    pub fn lookup(&self, name: &str) -> Option<Rect<f64>> {
        self.boxes.get(&normalize_name(name)).copied()
    }

    /// Name of the country whose polygon contains `(lon, lat)`.
    pub fn country_at(&self, lon: f64, lat: f64) -> Option<&str> {
        let point = Point::new(lon, lat);
        self.regions
            .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
            .find(|region| region.shape.contains(&point))
            .map(|region| region.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Where the map should move after a scope change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewport {
    FitBounds { min: [f64; 2], max: [f64; 2] },
    Unchanged,
}

impl Viewport {
    pub fn fit(rect: Option<Rect<f64>>) -> Self {
        match rect {
            Some(r) => Viewport::FitBounds {
                min: [r.min().x, r.min().y],
                max: [r.max().x, r.max().y],
            },
            None => Viewport::Unchanged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Worldwide,
    Country(String),
}

struct LibraryLocation {
    id: usize,
    position: [f64; 2],
}

impl RTreeObject for LibraryLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for LibraryLocation {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// The loaded points with everything a scope change needs: global stats,
/// normalized country tags, the boundary index and a hit-test tree.
pub struct CountryScoper {
    collection: FeatureCollection,
    global_stats: Stats,
    normalized_countries: Vec<String>,
    boundaries: Option<BoundaryIndex>,
    worldwide_label: String,
    tree: RTree<LibraryLocation>,
}

impl CountryScoper {
    pub fn new(collection: FeatureCollection, boundaries: Option<BoundaryIndex>) -> Self {
        let global_stats = compute_stats(&collection.features);
        let normalized_countries = collection
            .features
            .iter()
            .map(|f| normalize_name(&f.tags.country))
            .collect();
        let tree = RTree::bulk_load(
            collection
                .features
                .iter()
                .map(|f| LibraryLocation {
                    id: f.id,
                    position: [f.lon(), f.lat()],
                })
                .collect(),
        );
        CountryScoper {
            collection,
            global_stats,
            normalized_countries,
            boundaries,
            worldwide_label: WORLDWIDE.to_string(),
            tree,
        }
    }

    pub fn with_worldwide_label(mut self, label: impl Into<String>) -> Self {
        self.worldwide_label = label.into();
        self
    }

    pub fn collection(&self) -> &FeatureCollection {
        &self.collection
    }

    pub fn global_stats(&self) -> &Stats {
        &self.global_stats
    }

    pub fn countries(&self) -> &[String] {
        &self.collection.countries
    }

    pub fn boundaries(&self) -> Option<&BoundaryIndex> {
        self.boundaries.as_ref()
    }

    pub fn feature(&self, id: usize) -> Option<&GeoPoint> {
        self.collection.get(id)
    }

    pub fn worldwide_label(&self) -> &str {
        &self.worldwide_label
    }

    /// Country whose boundary polygon contains `(lon, lat)`, when boundaries
    /// are loaded.
    pub fn country_at(&self, lon: f64, lat: f64) -> Option<&str> {
        self.boundaries.as_ref()?.country_at(lon, lat)
    }

    pub fn is_worldwide(&self, name: &str) -> bool {
        let name = name.trim();
        name.is_empty() || name == self.worldwide_label || name == WORLDWIDE
    }

    /// Points whose normalized country tag equals the normalized `name`.
    pub fn features_in<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a GeoPoint> + 'a {
        let target = normalize_name(name);
        self.collection
            .features
            .iter()
            .zip(self.normalized_countries.iter())
            .filter(move |(_, country)| **country == target)
            .map(|(f, _)| f)
    }

    /// Nearest library to `(lon, lat)` within `tolerance` degrees.
    pub fn hit_test(&self, lon: f64, lat: f64, tolerance: f64) -> Option<&GeoPoint> {
        let query = [lon, lat];
        let nearest = self.tree.nearest_neighbor(&query)?;
        if nearest.distance_2(&query) <= tolerance * tolerance {
            self.feature(nearest.id)
        } else {
            None
        }
    }
}

/// One immutable dashboard state. Every transition builds a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeState {
    #[serde(skip)]
    pub scope: Scope,
    /// Display name of the scope: the configured Worldwide label or the
    /// country as selected.
    #[serde(rename = "scope")]
    pub label: String,
    pub feature_ids: Vec<usize>,
    pub stats: Stats,
    pub viewport: Viewport,
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
}

impl ScopeState {
    pub fn worldwide(scoper: &CountryScoper) -> Self {
        ScopeState {
            scope: Scope::Worldwide,
            label: scoper.worldwide_label.clone(),
            feature_ids: scoper.collection.features.iter().map(|f| f.id).collect(),
            stats: scoper.global_stats.clone(),
            viewport: Viewport::fit(feature::extent(&scoper.collection.features)),
            hovered: None,
            selected: None,
        }
    }

    pub fn select_country(&self, scoper: &CountryScoper, name: &str) -> Self {
        let base = if scoper.is_worldwide(name) {
            ScopeState::worldwide(scoper)
        } else {
            let subset: Vec<&GeoPoint> = scoper.features_in(name).collect();
            let bbox = scoper.boundaries.as_ref().and_then(|b| b.lookup(name));
            ScopeState {
                scope: Scope::Country(name.trim().to_string()),
                label: name.trim().to_string(),
                feature_ids: subset.iter().map(|f| f.id).collect(),
                stats: compute_stats(subset.iter().copied()),
                viewport: Viewport::fit(bbox),
                hovered: None,
                selected: None,
            }
        };
        ScopeState {
            hovered: self.hovered,
            selected: self.selected,
            ..base
        }
    }

    /// Selects a library and scopes to its country, Worldwide when it has none.
    pub fn click_feature(&self, scoper: &CountryScoper, id: usize) -> Self {
        match scoper.feature(id) {
            Some(feature) => {
                let next = ScopeState {
                    selected: Some(id),
                    ..self.clone()
                };
                next.select_country(scoper, &feature.tags.country)
            }
            None => self.click_empty(scoper),
        }
    }

    pub fn click_empty(&self, scoper: &CountryScoper) -> Self {
        ScopeState {
            selected: None,
            ..self.clone()
        }
        .select_country(scoper, "")
    }

    pub fn click_country_boundary(&self, scoper: &CountryScoper, name: &str) -> Self {
        ScopeState {
            selected: None,
            ..self.clone()
        }
        .select_country(scoper, name)
    }

    pub fn hover(&self, scoper: &CountryScoper, id: usize) -> Self {
        ScopeState {
            hovered: scoper.feature(id).map(|f| f.id),
            ..self.clone()
        }
    }

    pub fn unhover(&self) -> Self {
        ScopeState {
            hovered: None,
            ..self.clone()
        }
    }
}
