use crate::color::{parse_color, ColorRamp};
use crate::config::AppConfig;
use crate::data::{load_regions, load_table, GeoOptions, TableOptions};
use crate::error::{GeotifyError, GeotifyResult};
use crate::join::join_regions;
use crate::processing::{place_glyphs, scale_rows, GlyphOptions};
use crate::render::{union_extent, Surface};
use crate::types::{Glyph, JoinedRow, RegionFeature, RegionRecord, ScaledRow, Warning};
use geo::algorithm::bounding_rect::BoundingRect;
use image::Rgba;
use tracing::{info, warn};

/// What to draw. Each variant carries only the arguments it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Visualization {
    /// Flat-filled region outlines, no value join.
    Outline {
        region: Option<String>,
        fill: Rgba<u8>,
    },
    /// Choropleth fill by `value_column` plus one bar glyph per requested region.
    Overlay {
        regions: Vec<String>,
        value_column: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub title: String,
    pub joined: Vec<JoinedRow>,
    pub scaled: Vec<ScaledRow>,
    pub glyphs: Vec<Glyph>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct Style {
    pub ramp: ColorRamp,
    pub missing_color: Rgba<u8>,
    pub missing_edge_color: Rgba<u8>,
    pub edge_color: Rgba<u8>,
}

/// Both sources loaded and cached; immutable for the lifetime of the value.
#[derive(Debug, Clone)]
pub struct Visualizer {
    features: Vec<RegionFeature>,
    records: Vec<RegionRecord>,
    region_code: Option<String>,
    style: Style,
    glyph_width: f64,
    height_divisor: f64,
    max_displayed_regions: usize,
}

impl Visualizer {
    /// Load both sources. Any loader or style error aborts construction.
    pub fn load(config: &AppConfig) -> GeotifyResult<Self> {
        let geo_options = GeoOptions {
            name_property: config.input.name_property.clone(),
            code_property: config.input.code_property.clone(),
            code_length: config.input.code_length,
        };
        let delimiter = u8::try_from(config.input.delimiter).map_err(|_| {
            GeotifyError::InvalidConfig(format!(
                "delimiter '{}' is not a single-byte character",
                config.input.delimiter
            ))
        })?;
        let table_options = TableOptions {
            encoding: config.input.encoding.clone(),
            delimiter,
            key_column: config.input.key_column.clone(),
        };

        let features = load_regions(&config.input.geojson, &geo_options)?;
        let records = load_table(&config.input.data_csv, &table_options)?;
        Self::from_parts(features, records, config)
    }

    /// Build from already loaded sources.
    pub fn from_parts(
        features: Vec<RegionFeature>,
        records: Vec<RegionRecord>,
        config: &AppConfig,
    ) -> GeotifyResult<Self> {
        let style = Style {
            ramp: ColorRamp::from_name(&config.style.color_ramp)?,
            missing_color: parse_color(&config.style.missing_color)?,
            missing_edge_color: parse_color(&config.style.missing_edge_color)?,
            edge_color: parse_color(&config.style.edge_color)?,
        };
        if !(config.glyph.height_divisor.is_finite() && config.glyph.height_divisor > 0.0) {
            return Err(GeotifyError::InvalidConfig(format!(
                "glyph height divisor must be positive, got {}",
                config.glyph.height_divisor
            )));
        }

        Ok(Self {
            features,
            records,
            region_code: config.join.region_code.clone(),
            style,
            glyph_width: config.glyph.width,
            height_divisor: config.glyph.height_divisor,
            max_displayed_regions: config.glyph.max_displayed_regions,
        })
    }

    pub fn features(&self) -> &[RegionFeature] {
        &self.features
    }

    pub fn records(&self) -> &[RegionRecord] {
        &self.records
    }

    pub fn visualize(
        &self,
        request: &Visualization,
        surface: &mut dyn Surface,
    ) -> GeotifyResult<Frame> {
        match request {
            Visualization::Outline { region, fill } => {
                Ok(self.draw_outline(region.as_deref(), *fill, surface))
            }
            Visualization::Overlay {
                regions,
                value_column,
            } => self.draw_overlay(regions, value_column, surface),
        }
    }

    fn draw_outline(&self, region: Option<&str>, fill: Rgba<u8>, surface: &mut dyn Surface) -> Frame {
        let code = self.region_code.as_deref();
        let selected: Vec<&RegionFeature> = self
            .features
            .iter()
            .filter(|f| code.map_or(true, |c| f.code == c))
            .filter(|f| region.map_or(true, |name| f.name == name))
            .collect();

        let title = match region {
            Some(name) => format!("GeoMap Visualization - Region Name: {}", name),
            None => "GeoMap Visualization - Entire Map".to_string(),
        };

        let mut warnings = Vec::new();
        if selected.is_empty() {
            let context = match region {
                Some(name) => format!("region with name '{}' not found", name),
                None => format!("no regions with code {:?}", code),
            };
            warn!("{}", context);
            warnings.push(Warning::EmptyResult { context });
        }

        if let Some(extent) = union_extent(selected.iter().filter_map(|f| f.geometry.bounding_rect())) {
            surface.set_extent(extent);
            for feature in &selected {
                surface.fill_polygon(&feature.geometry, fill);
                surface.stroke_polygon(&feature.geometry, self.style.edge_color);
            }
            surface.title(&title);
        }

        Frame {
            title,
            joined: Vec::new(),
            scaled: Vec::new(),
            glyphs: Vec::new(),
            warnings,
        }
    }

    fn draw_overlay(
        &self,
        regions: &[String],
        value_column: &str,
        surface: &mut dyn Surface,
    ) -> GeotifyResult<Frame> {
        let joined = join_regions(&self.features, &self.records, self.region_code.as_deref());
        let mut warnings = Vec::new();

        if joined.is_empty() {
            if !regions.is_empty() {
                return Err(GeotifyError::RegionNotFound(dedup(regions)));
            }
            warnings.push(Warning::EmptyResult {
                context: format!("no regions with code {:?}", self.region_code),
            });
        } else if !joined.iter().any(|r| r.matched) {
            warn!("No region matched a table row");
            warnings.push(Warning::EmptyResult {
                context: "no region matched a table row".to_string(),
            });
        }

        let scaled = scale_rows(&joined, value_column, self.height_divisor);
        let placement = place_glyphs(
            &scaled,
            regions,
            &GlyphOptions {
                ramp: self.style.ramp,
                missing_color: self.style.missing_color,
                width: self.glyph_width,
                max_displayed_regions: self.max_displayed_regions,
            },
        )?;
        warnings.extend(placement.warnings);

        let title = format!("{} by region", value_column);
        let extent = union_extent(
            scaled
                .iter()
                .filter_map(|s| s.row.geometry.bounding_rect())
                .chain(placement.glyphs.iter().map(|g| g.rect())),
        );

        if let Some(extent) = extent {
            surface.set_extent(extent);
            for row in &scaled {
                match row.normalized {
                    Some(n) => {
                        surface.fill_polygon(&row.row.geometry, self.style.ramp.apply(n));
                        surface.stroke_polygon(&row.row.geometry, self.style.edge_color);
                    }
                    None => {
                        surface.fill_polygon(&row.row.geometry, self.style.missing_color);
                        surface.stroke_polygon(&row.row.geometry, self.style.missing_edge_color);
                    }
                }
            }
            for glyph in &placement.glyphs {
                surface.fill_rect(&glyph.rect(), glyph.color);
            }
            surface.title(&title);
        }

        info!(
            "Rendered '{}' with {} regions and {} glyphs",
            value_column,
            scaled.len(),
            placement.glyphs.len()
        );

        Ok(Frame {
            title,
            joined,
            scaled,
            glyphs: placement.glyphs,
            warnings,
        })
    }
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon, Rect};

    #[derive(Default)]
    struct Recorder {
        fills: usize,
        strokes: Vec<Rgba<u8>>,
        rects: Vec<Rgba<u8>>,
        title: Option<String>,
    }

    impl Surface for Recorder {
        fn set_extent(&mut self, _extent: Rect<f64>) {}
        fn fill_polygon(&mut self, _geometry: &MultiPolygon<f64>, _fill: Rgba<u8>) {
            self.fills += 1;
        }
        fn stroke_polygon(&mut self, _geometry: &MultiPolygon<f64>, edge: Rgba<u8>) {
            self.strokes.push(edge);
        }
        fn fill_rect(&mut self, _rect: &Rect<f64>, fill: Rgba<u8>) {
            self.rects.push(fill);
        }
        fn title(&mut self, text: &str) {
            self.title = Some(text.to_string());
        }
    }

    fn config() -> AppConfig {
        AppConfig::from_toml(
            "[input]\ngeojson = \"korea.json\"\ndata_csv = \"table.csv\"\nkey_column = \"key\"\n",
        )
        .unwrap()
    }

    fn feature(name: &str, code: &str, offset: f64) -> RegionFeature {
        RegionFeature {
            name: name.to_string(),
            code: code.to_string(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: offset, y: 0.0),
                (x: offset, y: 2.0),
                (x: offset + 2.0, y: 2.0),
                (x: offset + 2.0, y: 0.0),
            ]]),
        }
    }

    fn record(key: &str, pop: f64) -> RegionRecord {
        RegionRecord {
            key: key.to_string(),
            values: [("pop".to_string(), Some(pop))].into_iter().collect(),
        }
    }

    fn visualizer(region_code: Option<&str>) -> Visualizer {
        let mut config = config();
        config.join.region_code = region_code.map(str::to_string);
        Visualizer::from_parts(
            vec![feature("A", "11", 0.0), feature("B", "11", 3.0), feature("C", "12", 6.0)],
            vec![record("A", 10.0), record("B", 30.0)],
            &config,
        )
        .unwrap()
    }

    fn overlay(names: &[&str]) -> Visualization {
        Visualization::Overlay {
            regions: names.iter().map(|s| s.to_string()).collect(),
            value_column: "pop".to_string(),
        }
    }

    #[test]
    fn overlay_draws_fills_glyphs_and_title() {
        let vis = visualizer(Some("11"));
        let mut surface = Recorder::default();
        let frame = vis.visualize(&overlay(&["B"]), &mut surface).unwrap();

        assert_eq!(frame.joined.len(), 2);
        assert_eq!(frame.glyphs.len(), 1);
        assert_eq!(surface.fills, 2);
        assert_eq!(surface.rects, vec![ColorRamp::YlGnBu.apply(1.0)]);
        assert_eq!(surface.title.as_deref(), Some("pop by region"));
        assert!(frame.warnings.is_empty());
    }

    #[test]
    fn unmatched_rows_use_missing_edge_color() {
        let vis = visualizer(None);
        let mut surface = Recorder::default();
        vis.visualize(&overlay(&[]), &mut surface).unwrap();
        assert_eq!(surface.strokes.len(), 3);
        assert_eq!(surface.strokes[2], parse_color("red").unwrap());
        assert_eq!(surface.strokes[0], parse_color("black").unwrap());
    }

    #[test]
    fn missing_region_fails_only_that_call() {
        let vis = visualizer(Some("11"));
        let mut surface = Recorder::default();
        let err = vis.visualize(&overlay(&["C"]), &mut surface).unwrap_err();
        assert!(matches!(err, GeotifyError::RegionNotFound(ref names) if names == &["C".to_string()]));
        assert!(vis.visualize(&overlay(&["A"]), &mut surface).is_ok());
    }

    #[test]
    fn empty_filter_is_a_warning_unless_regions_requested() {
        let vis = visualizer(Some("99"));
        let mut surface = Recorder::default();
        let frame = vis.visualize(&overlay(&[]), &mut surface).unwrap();
        assert!(frame.joined.is_empty());
        assert!(matches!(frame.warnings[0], Warning::EmptyResult { .. }));
        assert!(surface.title.is_none());

        let err = vis.visualize(&overlay(&["A", "A"]), &mut surface).unwrap_err();
        assert!(matches!(err, GeotifyError::RegionNotFound(ref names) if names.len() == 1));
    }

    #[test]
    fn outline_draws_selected_region() {
        let vis = visualizer(None);
        let mut surface = Recorder::default();
        let request = Visualization::Outline {
            region: Some("C".to_string()),
            fill: Rgba([0, 0, 255, 255]),
        };
        let frame = vis.visualize(&request, &mut surface).unwrap();
        assert_eq!(surface.fills, 1);
        assert_eq!(frame.title, "GeoMap Visualization - Region Name: C");
        assert!(frame.warnings.is_empty());
    }

    #[test]
    fn outline_of_unknown_region_warns() {
        let vis = visualizer(None);
        let mut surface = Recorder::default();
        let request = Visualization::Outline {
            region: Some("남원시".to_string()),
            fill: Rgba([0, 0, 255, 255]),
        };
        let frame = vis.visualize(&request, &mut surface).unwrap();
        assert_eq!(surface.fills, 0);
        assert_eq!(
            frame.warnings,
            vec![Warning::EmptyResult {
                context: "region with name '남원시' not found".to_string()
            }]
        );
    }

    #[test]
    fn invalid_style_aborts_construction() {
        let mut bad_ramp = config();
        bad_ramp.style.color_ramp = "rainbow".to_string();
        assert!(Visualizer::from_parts(Vec::new(), Vec::new(), &bad_ramp).is_err());

        let mut bad_divisor = config();
        bad_divisor.glyph.height_divisor = 0.0;
        assert!(Visualizer::from_parts(Vec::new(), Vec::new(), &bad_divisor).is_err());
    }
}
