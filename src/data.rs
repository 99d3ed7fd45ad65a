use crate::error::{GeotifyError, GeotifyResult};
use crate::types::{RegionFeature, RegionRecord, Values};
use csv::ReaderBuilder;
use encoding_rs::{Encoding, EUC_KR};
use geo::MultiPolygon;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Attribute names used to read region name and code from a polygon source.
#[derive(Debug, Clone)]
pub struct GeoOptions {
    pub name_property: String,
    pub code_property: String,
    /// Keep only this many leading characters of the code (e.g. 2 turns a
    /// municipal code into its province code).
    pub code_length: Option<usize>,
}

impl GeoOptions {
    fn region_code(&self, raw: Option<String>) -> String {
        let code = raw.unwrap_or_default();
        match self.code_length {
            Some(n) => code.chars().take(n).collect(),
            None => code,
        }
    }
}

impl Default for GeoOptions {
    fn default() -> Self {
        Self {
            name_property: "name".to_string(),
            code_property: "code".to_string(),
            code_length: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableOptions {
    pub encoding: String,
    pub delimiter: u8,
    pub key_column: String,
}

impl TableOptions {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            encoding: "utf-8".to_string(),
            delimiter: b',',
            key_column: key_column.into(),
        }
    }
}

/// Encoding tried once when the requested one cannot decode the table.
pub const FALLBACK_ENCODING: &Encoding = EUC_KR;

fn ensure_regular_file(path: &Path) -> GeotifyResult<()> {
    let meta = fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => GeotifyError::NotFound(path.to_path_buf()),
        _ => GeotifyError::invalid_format(path, e.to_string()),
    })?;
    if !meta.is_file() {
        return Err(GeotifyError::invalid_format(path, "not a regular file"));
    }
    Ok(())
}

// ============================================================================
// Polygon source
// ============================================================================

pub fn load_regions(path: &Path, options: &GeoOptions) -> GeotifyResult<Vec<RegionFeature>> {
    ensure_regular_file(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| GeotifyError::invalid_format(path, "input geometry file has no extension"))?;

    let regions = match extension.as_str() {
        "shp" => load_shapefile(path, options)?,
        "json" | "geojson" => load_geojson(path, options)?,
        other => {
            return Err(GeotifyError::invalid_format(
                path,
                format!("unsupported geometry format: {}", other),
            ))
        }
    };

    info!("Loaded {} regions from {:?}", regions.len(), path);
    Ok(regions)
}

fn load_geojson(path: &Path, options: &GeoOptions) -> GeotifyResult<Vec<RegionFeature>> {
    use geojson::GeoJson;

    let file = File::open(path).map_err(|e| GeotifyError::invalid_format(path, e.to_string()))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .map_err(|e| GeotifyError::invalid_format(path, format!("failed to parse GeoJSON: {}", e)))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(GeotifyError::invalid_format(path, "GeoJSON must be a FeatureCollection")),
    };

    let total = collection.features.len();
    let converted: Vec<Option<RegionFeature>> = collection
        .features
        .into_par_iter()
        .map(|feature| convert_feature(feature, options))
        .collect::<Result<_, String>>()
        .map_err(|message| GeotifyError::invalid_format(path, message))?;

    let regions: Vec<RegionFeature> = converted.into_iter().flatten().collect();
    if regions.len() < total {
        debug!("Skipped {} features without a name or polygon geometry", total - regions.len());
    }
    Ok(regions)
}

fn convert_feature(
    feature: geojson::Feature,
    options: &GeoOptions,
) -> Result<Option<RegionFeature>, String> {
    let props = feature.properties.as_ref();
    let name = match props.and_then(|p| p.get(&options.name_property)).and_then(json_to_string) {
        Some(name) => name,
        None => return Ok(None),
    };
    let code = options.region_code(
        props
            .and_then(|p| p.get(&options.code_property))
            .and_then(json_to_string),
    );

    let geometry = match feature.geometry {
        Some(geom) => {
            let geometry: geo::Geometry<f64> = geom
                .value
                .try_into()
                .map_err(|e| format!("failed to convert geometry of '{}': {:?}", name, e))?;
            match geometry {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => return Ok(None),
            }
        }
        None => return Ok(None),
    };

    Ok(Some(RegionFeature { name, code, geometry }))
}

fn json_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn load_shapefile(path: &Path, options: &GeoOptions) -> GeotifyResult<Vec<RegionFeature>> {
    use shapefile::dbase::{FieldValue, Record};

    let mut reader = shapefile::Reader::from_path(path)
        .map_err(|e| GeotifyError::invalid_format(path, format!("failed to open Shapefile: {}", e)))?;

    fn field(record: &Record, name: &str) -> Option<String> {
        match record.get(name) {
            Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
            Some(FieldValue::Numeric(Some(n))) => Some(n.to_string()),
            _ => None,
        }
    }

    let mut regions = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) =
            result.map_err(|e| GeotifyError::invalid_format(path, e.to_string()))?;

        let name = match field(&record, &options.name_property) {
            Some(name) => name,
            None => continue,
        };
        let code = options.region_code(field(&record, &options.code_property));

        let convert_err = |e: &dyn std::fmt::Debug| {
            GeotifyError::invalid_format(path, format!("failed to convert polygon of '{}': {:?}", name, e))
        };
        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => MultiPolygon::try_from(polygon).map_err(|e| convert_err(&e))?,
            shapefile::Shape::PolygonM(polygon) => MultiPolygon::try_from(polygon).map_err(|e| convert_err(&e))?,
            shapefile::Shape::PolygonZ(polygon) => MultiPolygon::try_from(polygon).map_err(|e| convert_err(&e))?,
            _ => {
                debug!("Skipping non-polygon shape for region '{}'", name);
                continue;
            }
        };

        regions.push(RegionFeature { name, code, geometry });
    }

    Ok(regions)
}

// ============================================================================
// Tabular source
// ============================================================================

pub fn load_table(path: &Path, options: &TableOptions) -> GeotifyResult<Vec<RegionRecord>> {
    ensure_regular_file(path)?;
    let bytes = fs::read(path).map_err(|e| GeotifyError::invalid_format(path, e.to_string()))?;

    let requested = encoding_for_label(&options.encoding)?;
    let text = decode_with_fallback(path, &bytes, requested)?;

    let records = parse_table(path, &text, options)?;
    info!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

pub fn encoding_for_label(label: &str) -> GeotifyResult<&'static Encoding> {
    let label = label.trim();
    if label.eq_ignore_ascii_case("cp949") {
        return Ok(EUC_KR);
    }
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| GeotifyError::InvalidConfig(format!("unknown text encoding '{}'", label)))
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let bytes = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn decode_with_fallback(
    path: &Path,
    bytes: &[u8],
    requested: &'static Encoding,
) -> GeotifyResult<String> {
    if let Some(text) = decode_strict(bytes, requested) {
        return Ok(text);
    }

    let mut tried = vec![requested.name().to_string()];
    if requested != FALLBACK_ENCODING {
        warn!(
            "{:?} is not valid {}, retrying as {}",
            path,
            requested.name(),
            FALLBACK_ENCODING.name()
        );
        if let Some(text) = decode_strict(bytes, FALLBACK_ENCODING) {
            return Ok(text);
        }
        tried.push(FALLBACK_ENCODING.name().to_string());
    }

    Err(GeotifyError::Encoding {
        path: path.to_path_buf(),
        tried,
    })
}

fn parse_table(path: &Path, text: &str, options: &TableOptions) -> GeotifyResult<Vec<RegionRecord>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| GeotifyError::invalid_format(path, format!("failed to read header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let key_idx = headers
        .iter()
        .position(|h| *h == options.key_column)
        .ok_or_else(|| {
            GeotifyError::invalid_format(
                path,
                format!("key column '{}' not found in header", options.key_column),
            )
        })?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for result in rdr.records() {
        let record = result.map_err(|e| GeotifyError::invalid_format(path, csv_error_message(&e)))?;

        let key = record.get(key_idx).unwrap_or("").trim().to_string();
        if key.is_empty() {
            debug!("Skipping row with empty key at {:?}", record.position());
            continue;
        }
        if !seen.insert(key.clone()) {
            warn!("Duplicate key '{}' in {:?}, keeping the first row", key, path);
            continue;
        }

        let values: Values = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_idx)
            .map(|(i, h)| {
                let value = record.get(i).and_then(|cell| parse_number(cell, options.delimiter));
                (h.clone(), value)
            })
            .collect();

        records.push(RegionRecord { key, values });
    }

    Ok(records)
}

fn csv_error_message(err: &csv::Error) -> String {
    match err.position() {
        Some(pos) => format!("malformed row at line {}: {}", pos.line(), err),
        None => format!("malformed table: {}", err),
    }
}

/// Parse a statistics cell; `-`, blanks and text are missing values.
///
/// Commas are thousands separators only in comma-delimited tables. Under any
/// other delimiter a comma is kept, so `1,5` is missing rather than 15.
pub fn parse_number(raw: &str, delimiter: u8) -> Option<f64> {
    let raw = raw.trim();
    let cleaned: String = if delimiter == b',' {
        raw.chars().filter(|c| *c != ',').collect()
    } else {
        raw.to_string()
    };
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
