use crate::types::{ConnectionBucket, Connectivity, DownloadBucket, GeoPoint, QualityBucket, Reason};
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary counts for one scope. Count maps carry every key, zero or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_points: usize,
    pub connectivity_mapped: usize,
    pub download_measured: usize,
    pub good_download: usize,
    pub dl_red: usize,
    pub dl_orange: usize,
    pub dl_green: usize,
    pub internet_yes: usize,
    pub internet_no: usize,
    pub connection_type_counts: BTreeMap<ConnectionBucket, usize>,
    pub not_connect_reasons_counts: BTreeMap<Reason, usize>,
    pub perceived_quality_counts: BTreeMap<QualityBucket, usize>,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            total_points: 0,
            connectivity_mapped: 0,
            download_measured: 0,
            good_download: 0,
            dl_red: 0,
            dl_orange: 0,
            dl_green: 0,
            internet_yes: 0,
            internet_no: 0,
            connection_type_counts: ConnectionBucket::ALL.into_iter().map(|b| (b, 0)).collect(),
            not_connect_reasons_counts: Reason::ALL.into_iter().map(|r| (r, 0)).collect(),
            perceived_quality_counts: QualityBucket::ALL.into_iter().map(|q| (q, 0)).collect(),
        }
    }
}

fn bump<K: Ord>(counts: &mut BTreeMap<K, usize>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

pub fn compute_stats<'a>(features: impl IntoIterator<Item = &'a GeoPoint>) -> Stats {
    let mut stats = Stats::default();

    for feature in features {
        let tags = &feature.tags;
        stats.total_points += 1;

        if tags.has_connectivity_info {
            stats.connectivity_mapped += 1;
        }

        match tags.connectivity {
            Connectivity::Yes => stats.internet_yes += 1,
            Connectivity::No => stats.internet_no += 1,
            Connectivity::Unknown => {}
        }

        match tags.download_bucket {
            DownloadBucket::Red => stats.dl_red += 1,
            DownloadBucket::Orange => stats.dl_orange += 1,
            DownloadBucket::Green => stats.dl_green += 1,
            DownloadBucket::Unknown => {}
        }
        if tags.download_bucket != DownloadBucket::Unknown {
            stats.download_measured += 1;
        }

        for bucket in &tags.connection_buckets {
            bump(&mut stats.connection_type_counts, *bucket);
        }

        // `reasons` is empty unless the library reported no connection
        if tags.connectivity == Connectivity::No {
            for reason in &tags.reasons {
                bump(&mut stats.not_connect_reasons_counts, *reason);
            }
        }

        bump(&mut stats.perceived_quality_counts, tags.perceived_quality_bucket);
    }

    stats.good_download = stats.dl_green;
    stats
}

fn share(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

impl Stats {
    /// Percentage of measured libraries in a download bucket.
    pub fn download_share(&self, bucket: DownloadBucket) -> Option<f64> {
        let count = match bucket {
            DownloadBucket::Red => self.dl_red,
            DownloadBucket::Orange => self.dl_orange,
            DownloadBucket::Green => self.dl_green,
            DownloadBucket::Unknown => self.total_points.saturating_sub(self.download_measured),
        };
        let whole = match bucket {
            DownloadBucket::Unknown => self.total_points,
            _ => self.download_measured,
        };
        share(count, whole)
    }

    pub fn mapped_share(&self) -> Option<f64> {
        share(self.connectivity_mapped, self.total_points)
    }

    pub fn connected_share(&self) -> Option<f64> {
        share(self.internet_yes, self.total_points)
    }

    pub fn points_label(&self) -> String {
        if self.total_points == 0 {
            return "N/A".to_string();
        }
        format!("of {} libraries mapped", format_k(self.total_points))
    }
}

pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.0}%", v),
        _ => "N/A".to_string(),
    }
}

/// `1234` → `"1 k"`, `999` → `"999"`.
pub fn format_k(n: usize) -> String {
    if n >= 1000 {
        format!("{} k", (n as f64 / 1000.0).round() as usize)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns;
    use crate::feature::build_feature;
    use crate::types::{CellValue, RawRecord};

    fn feature(id: usize, pairs: &[(&str, &str)]) -> GeoPoint {
        let mut row = RawRecord::new();
        row.insert("lat", CellValue::Number(1.0));
        row.insert("lon", CellValue::Number(1.0));
        for (k, v) in pairs {
            row.insert(*k, CellValue::from_raw(v));
        }
        build_feature(&row, id).expect("coordinates")
    }

    fn sample() -> Vec<GeoPoint> {
        vec![
            feature(0, &[(columns::INTERNET_ACCESS, "Yes"), (columns::DOWNLOAD_SPEED, "More than 100 Mbps")]),
            feature(1, &[(columns::INTERNET_ACCESS, "No"), (columns::DOWNLOAD_SPEED, "less than 1 Mbps")]),
            feature(2, &[(columns::DOWNLOAD_SPEED, "Between 20-40 Mbps"), (columns::PERCEIVED_QUALITY, "55")]),
            feature(3, &[(columns::CONNECTION_TYPE, "Fiber optic, Mobile (4G)")]),
        ]
    }

    #[test]
    fn empty_collection_has_zeroed_maps() {
        let stats = compute_stats(std::iter::empty());
        assert_eq!(stats, Stats::default());
        assert_eq!(stats.connection_type_counts.len(), 7);
        assert_eq!(stats.not_connect_reasons_counts.len(), 5);
        assert_eq!(stats.perceived_quality_counts.len(), 6);
        assert_eq!(format_percent(stats.mapped_share()), "N/A");
        assert_eq!(format_percent(stats.download_share(DownloadBucket::Green)), "N/A");
        assert_eq!(stats.points_label(), "N/A");
    }

    #[test]
    fn download_counters_sum_to_measured() {
        let stats = compute_stats(&sample());
        assert_eq!(stats.total_points, 4);
        assert_eq!(stats.download_measured, 3);
        assert_eq!(stats.dl_red + stats.dl_orange + stats.dl_green, stats.download_measured);
        assert_eq!(stats.good_download, 1);
        assert_eq!(stats.internet_yes, 1);
        assert_eq!(stats.internet_no, 1);
        assert_eq!(stats.connectivity_mapped, 2);
    }

    #[test]
    fn multi_valued_connections_count_every_bucket() {
        let stats = compute_stats(&sample());
        assert_eq!(stats.connection_type_counts[&ConnectionBucket::OpticFiber], 1);
        assert_eq!(stats.connection_type_counts[&ConnectionBucket::MobileData], 1);
        assert_eq!(stats.connection_type_counts[&ConnectionBucket::Unknown], 3);
    }

    #[test]
    fn quality_counted_for_every_feature() {
        let stats = compute_stats(&sample());
        assert_eq!(stats.perceived_quality_counts[&QualityBucket::Fair], 1);
        assert_eq!(stats.perceived_quality_counts[&QualityBucket::Unknown], 3);
        let total: usize = stats.perceived_quality_counts.values().sum();
        assert_eq!(total, stats.total_points);
    }

    #[test]
    fn all_of_the_above_increments_each_reason() {
        let features = vec![
            feature(0, &[
                (columns::INTERNET_ACCESS, "No"),
                ("All of the above:Why not?", "All of the above"),
            ]),
            feature(1, &[
                (columns::INTERNET_ACCESS, "Yes"),
                ("High cost:Why not?", "High cost"),
            ]),
        ];
        let stats = compute_stats(&features);
        for reason in Reason::ALL {
            assert_eq!(stats.not_connect_reasons_counts[&reason], 1, "{reason}");
        }
    }

    #[test]
    fn compute_is_idempotent() {
        let features = sample();
        assert_eq!(compute_stats(&features), compute_stats(&features));
    }

    #[test]
    fn shares_and_labels() {
        let stats = compute_stats(&sample());
        assert_eq!(format_percent(stats.download_share(DownloadBucket::Red)), "33%");
        assert_eq!(format_percent(stats.mapped_share()), "50%");
        assert_eq!(stats.points_label(), "of 4 libraries mapped");
        assert_eq!(format_k(12_400), "12 k");
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let json = serde_json::to_value(compute_stats(&sample())).expect("serialize");
        assert_eq!(json["totalPoints"], 4);
        assert_eq!(json["dlGreen"], 1);
        assert_eq!(json["connectionTypeCounts"]["optic_fiber"], 1);
        assert_eq!(json["notConnectReasonsCounts"]["high_cost"], 0);
        assert_eq!(json["perceivedQualityCounts"]["fair"], 1);
    }
}
