use geo::Point;
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// One scalar cell of the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// Types a raw CSV cell: finite numbers become `Number`, blanks `Empty`.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Empty => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Empty => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Empty => serializer.serialize_none(),
        }
    }
}

/// A source row keyed by survey-question text.
///
/// Multi-select answers arrive as separate `"<option>:<question>"` columns;
/// see [`crate::columns`] for the declared ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawRecord(HashMap<String, CellValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: CellValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.0.get(key)
    }

    /// Trimmed display form of a cell, `""` when missing.
    pub fn text(&self, key: &str) -> String {
        self.get(key)
            .map(|v| v.to_string().trim().to_string())
            .unwrap_or_default()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(CellValue::as_number)
    }

    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).map(|v| !v.is_empty()).unwrap_or(false)
    }

    pub fn remove(&mut self, key: &str) -> Option<CellValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CellValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        RawRecord(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Yes,
    No,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadBucket {
    Red,
    Orange,
    Green,
    Unknown,
}

/// Declaration order doubles as primary-bucket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionBucket {
    OpticFiber,
    Cable,
    Dsl,
    MobileData,
    Satellite,
    Other,
    Unknown,
}

impl ConnectionBucket {
    pub const ALL: [ConnectionBucket; 7] = [
        ConnectionBucket::OpticFiber,
        ConnectionBucket::Cable,
        ConnectionBucket::Dsl,
        ConnectionBucket::MobileData,
        ConnectionBucket::Satellite,
        ConnectionBucket::Other,
        ConnectionBucket::Unknown,
    ];
}

/// An individual reason a disconnected library gave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Infrastructure,
    HighCost,
    Electrical,
    DigitalLiteracy,
    Policy,
}

impl Reason {
    pub const ALL: [Reason; 5] = [
        Reason::Infrastructure,
        Reason::HighCost,
        Reason::Electrical,
        Reason::DigitalLiteracy,
        Reason::Policy,
    ];
}

/// Per-point reason tag used for map colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonBucket {
    Infrastructure,
    HighCost,
    Electrical,
    DigitalLiteracy,
    Policy,
    Multi,
    Unknown,
}

impl From<Reason> for ReasonBucket {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Infrastructure => ReasonBucket::Infrastructure,
            Reason::HighCost => ReasonBucket::HighCost,
            Reason::Electrical => ReasonBucket::Electrical,
            Reason::DigitalLiteracy => ReasonBucket::DigitalLiteracy,
            Reason::Policy => ReasonBucket::Policy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBucket {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
    Unknown,
}

impl QualityBucket {
    pub const ALL: [QualityBucket; 6] = [
        QualityBucket::VeryPoor,
        QualityBucket::Poor,
        QualityBucket::Fair,
        QualityBucket::Good,
        QualityBucket::Excellent,
        QualityBucket::Unknown,
    ];
}

macro_rules! tag_str {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tag_str!(Connectivity { Yes => "yes", No => "no", Unknown => "unknown" });
tag_str!(DownloadBucket { Red => "red", Orange => "orange", Green => "green", Unknown => "unknown" });
tag_str!(ConnectionBucket {
    OpticFiber => "optic_fiber",
    Cable => "cable",
    Dsl => "dsl",
    MobileData => "mobile_data",
    Satellite => "satellite",
    Other => "other",
    Unknown => "unknown",
});
tag_str!(Reason {
    Infrastructure => "infrastructure",
    HighCost => "high_cost",
    Electrical => "electrical",
    DigitalLiteracy => "digital_literacy",
    Policy => "policy",
});
tag_str!(ReasonBucket {
    Infrastructure => "infrastructure",
    HighCost => "high_cost",
    Electrical => "electrical",
    DigitalLiteracy => "digital_literacy",
    Policy => "policy",
    Multi => "multi",
    Unknown => "unknown",
});
tag_str!(QualityBucket {
    VeryPoor => "very_poor",
    Poor => "poor",
    Fair => "fair",
    Good => "good",
    Excellent => "excellent",
    Unknown => "unknown",
});

/// Classification tags precomputed for one library.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tags {
    pub country: String,
    pub connectivity: Connectivity,
    pub has_connectivity_info: bool,
    pub download_bucket: DownloadBucket,
    pub connection_bucket: ConnectionBucket,
    pub connection_buckets: BTreeSet<ConnectionBucket>,
    pub reason_bucket: ReasonBucket,
    pub reasons: BTreeSet<Reason>,
    pub perceived_quality_bucket: QualityBucket,
    pub has_data: bool,
}

/// A library location with its original answers and derived tags.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub id: usize,
    pub point: Point<f64>,
    pub properties: RawRecord,
    pub tags: Tags,
}

impl GeoPoint {
    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }
}
