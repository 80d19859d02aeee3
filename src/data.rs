use crate::config::AppConfig;
use crate::error::LoadError;
use crate::feature::build_collection;
use crate::scope::{BoundaryIndex, CountryScoper};
use crate::types::{CellValue, RawRecord};
use csv::ReaderBuilder;
use geojson::GeoJson;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Source::Url(trimmed.to_string())
        } else {
            Source::Path(PathBuf::from(trimmed))
        }
    }
}

pub async fn fetch(source: &Source, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    match source {
        Source::Path(path) => tokio::fs::read(path).await.map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        }),
        Source::Url(url) => {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    status: status.as_u16(),
                    url: url.clone(),
                });
            }
            Ok(response.bytes().await?.to_vec())
        }
    }
}

/// Reads a headed CSV into records. Blank lines are skipped and short rows
/// get `Empty` for their missing cells.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<RawRecord>, LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let row: RawRecord = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header, CellValue::from_raw(record.get(i).unwrap_or(""))))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub fn parse_boundaries<R: Read>(reader: R) -> Result<BoundaryIndex, LoadError> {
    let geojson = GeoJson::from_reader(reader)?;
    BoundaryIndex::from_geojson(geojson)
}

async fn load_boundaries(location: &str, timeout: Duration) -> Result<BoundaryIndex, LoadError> {
    let bytes = fetch(&Source::parse(location), timeout).await?;
    parse_boundaries(bytes.as_slice())
}

/// Loads the survey and, when configured, the country boundaries. A boundary
/// failure only disables viewport fitting.
pub async fn load_scoper(config: &AppConfig) -> Result<CountryScoper, LoadError> {
    let timeout = Duration::from_secs(config.input.fetch_timeout_secs);

    info!("Loading dataset from {}", config.input.dataset);
    let bytes = fetch(&Source::parse(&config.input.dataset), timeout).await?;
    let rows = parse_rows(bytes.as_slice())?;
    let collection = build_collection(&rows);
    info!(
        "Read {} rows: {} libraries mapped, {} dropped, {} countries",
        collection.rows_read,
        collection.len(),
        collection.rows_dropped(),
        collection.countries.len()
    );

    let boundaries = match &config.input.boundaries {
        Some(location) => match load_boundaries(location, timeout).await {
            Ok(index) => {
                info!("Indexed {} boundary names", index.len());
                Some(index)
            }
            Err(e) => {
                warn!("Country boundaries unavailable, viewport fitting disabled: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(CountryScoper::new(collection, boundaries).with_worldwide_label(&config.scope.worldwide_label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns;
    use crate::config::AppConfig;
    use std::io::Write;

    const CSV: &str = "lat,lon,country,Does the library currently have Internet access?,name\n\
        41.39,2.16,Spain,Yes,Central\n\
        \n\
        ,1.0,Spain,No,\n\
        -1.29,36.82,Kenya\n";

    #[test]
    fn rows_are_dynamically_typed() {
        let rows = parse_rows(CSV.as_bytes()).expect("csv");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("lat"), Some(&CellValue::Number(41.39)));
        assert_eq!(rows[0].get("country"), Some(&CellValue::Text("Spain".into())));
        assert_eq!(rows[1].get("lat"), Some(&CellValue::Empty));
        assert_eq!(rows[2].get(columns::INTERNET_ACCESS), Some(&CellValue::Empty));
        assert_eq!(rows[2].get("name"), Some(&CellValue::Empty));
    }

    #[test]
    fn source_distinguishes_urls_from_paths() {
        assert_eq!(Source::parse("https://x.org/a.csv"), Source::Url("https://x.org/a.csv".into()));
        assert_eq!(Source::parse("data/a.csv"), Source::Path(PathBuf::from("data/a.csv")));
    }

    #[test]
    fn malformed_boundaries_are_a_json_error() {
        assert!(matches!(parse_boundaries("not json".as_bytes()), Err(LoadError::Json(_))));
    }

    #[test]
    fn boundaries_must_be_a_feature_collection() {
        let point = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#;
        assert!(matches!(
            parse_boundaries(point.as_bytes()),
            Err(LoadError::NotFeatureCollection(_))
        ));
    }

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(content.as_bytes()).expect("write");
        path.display().to_string()
    }

    #[tokio::test]
    async fn loads_from_disk_and_survives_bad_boundaries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dataset = write_temp(&dir, "libraries.csv", CSV);
        let boundaries = write_temp(&dir, "countries.geojson", "not json");
        let config = AppConfig::from_toml(&format!(
            "[input]\ndataset = {:?}\nboundaries = {:?}\n",
            dataset, boundaries
        ))
        .expect("config");

        let scoper = load_scoper(&config).await.expect("dataset loads");
        assert_eq!(scoper.collection().len(), 2);
        assert_eq!(scoper.collection().rows_dropped(), 1);
        assert!(scoper.boundaries().is_none());
        assert_eq!(scoper.countries(), ["Spain".to_string(), "Kenya".to_string()]);
    }

    #[tokio::test]
    async fn missing_dataset_is_an_io_error() {
        let config = AppConfig::from_toml("[input]\ndataset = \"/nonexistent/libraries.csv\"\n")
            .expect("config");
        assert!(matches!(load_scoper(&config).await, Err(LoadError::Io { .. })));
    }
}
