use crate::types::{JoinedRow, RegionFeature, RegionRecord, Values};
use std::collections::HashMap;
use tracing::{info, warn};

/// Left outer join of features and records on `feature.name == record.key`.
///
/// Features are first restricted to `region_code` when given. Every remaining
/// feature yields exactly one row; unmatched features keep `matched = false`
/// and empty values so they still show up on the map.
pub fn join_regions(
    features: &[RegionFeature],
    records: &[RegionRecord],
    region_code: Option<&str>,
) -> Vec<JoinedRow> {
    let mut by_key: HashMap<&str, &RegionRecord> = HashMap::with_capacity(records.len());
    for record in records {
        by_key.entry(record.key.as_str()).or_insert(record);
    }

    let rows: Vec<JoinedRow> = features
        .iter()
        .filter(|f| region_code.map_or(true, |code| f.code == code))
        .map(|feature| match by_key.get(feature.name.as_str()) {
            Some(record) => JoinedRow {
                name: feature.name.clone(),
                code: feature.code.clone(),
                geometry: feature.geometry.clone(),
                key: Some(record.key.clone()),
                values: record.values.clone(),
                matched: true,
            },
            None => JoinedRow {
                name: feature.name.clone(),
                code: feature.code.clone(),
                geometry: feature.geometry.clone(),
                key: None,
                values: Values::new(),
                matched: false,
            },
        })
        .collect();

    if rows.is_empty() {
        warn!("No regions left after filtering by code {:?}", region_code);
    } else {
        let matched = rows.iter().filter(|r| r.matched).count();
        info!("Joined {} regions, {} matched, {} missing", rows.len(), matched, rows.len() - matched);
    }

    rows
}
