use crate::color::ColorRamp;
use crate::error::{GeotifyError, GeotifyResult};
use crate::types::{Glyph, JoinedRow, ScaledRow, Warning};
use geo::{MultiPolygon, Point};
use image::Rgba;
use tracing::{debug, warn};

/// Normalize `column` against its maximum over matched rows.
///
/// `normalized` and `scaled_height` stay `None` for missing values, and for
/// every row when the maximum is not positive or no matched row has a value.
/// Negative values under a positive maximum clamp to 0.
pub fn scale_rows(rows: &[JoinedRow], column: &str, height_divisor: f64) -> Vec<ScaledRow> {
    let max = rows
        .iter()
        .filter(|r| r.matched)
        .filter_map(|r| r.value(column))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    if max.is_none() && rows.iter().any(|r| r.matched) {
        debug!("Column '{}' has no values among matched rows", column);
    }

    let divisor = match max {
        Some(m) if m > 0.0 => Some(m),
        _ => None,
    };

    rows.iter()
        .map(|row| {
            let value = if row.matched { row.value(column) } else { None };
            let normalized = match (value, divisor) {
                (Some(v), Some(m)) => Some((v / m).clamp(0.0, 1.0)),
                _ => None,
            };
            ScaledRow {
                row: row.clone(),
                value,
                normalized,
                scaled_height: normalized.map(|n| n / height_divisor),
            }
        })
        .collect()
}

/// Mean of every boundary vertex over all rings of all parts.
///
/// Rings are stored closed; the closing repeat of the first vertex is not
/// counted. This is not the area-weighted centroid.
pub fn vertex_centroid(geometry: &MultiPolygon<f64>) -> Option<Point<f64>> {
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut count = 0usize;

    for polygon in geometry {
        let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
        for ring in rings {
            let coords = &ring.0;
            let n = match (coords.first(), coords.last()) {
                (Some(first), Some(last)) if coords.len() > 1 && first == last => coords.len() - 1,
                _ => coords.len(),
            };
            for c in &coords[..n] {
                sum_x += c.x;
                sum_y += c.y;
            }
            count += n;
        }
    }

    if count == 0 {
        return None;
    }
    Some(Point::new(sum_x / count as f64, sum_y / count as f64))
}

#[derive(Debug, Clone)]
pub struct GlyphOptions {
    pub ramp: ColorRamp,
    pub missing_color: Rgba<u8>,
    pub width: f64,
    pub max_displayed_regions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub glyphs: Vec<Glyph>,
    pub warnings: Vec<Warning>,
}

/// Build one bar glyph per requested region, in request order.
///
/// Every requested name must belong to a matched row; otherwise the call
/// fails with all offending names.
pub fn place_glyphs(
    rows: &[ScaledRow],
    requested: &[String],
    options: &GlyphOptions,
) -> GeotifyResult<Placement> {
    let mut warnings = Vec::new();
    if requested.len() > options.max_displayed_regions {
        warn!(
            "{} regions requested, more than {} may not be legible",
            requested.len(),
            options.max_displayed_regions
        );
        warnings.push(Warning::Legibility {
            requested: requested.len(),
            max: options.max_displayed_regions,
        });
    }

    let lookup = |name: &str| rows.iter().find(|r| r.row.matched && r.row.name == name);

    let mut missing: Vec<String> = Vec::new();
    for name in requested {
        if lookup(name).is_none() && !missing.contains(name) {
            missing.push(name.clone());
        }
    }
    if !missing.is_empty() {
        return Err(GeotifyError::RegionNotFound(missing));
    }

    let mut glyphs = Vec::with_capacity(requested.len());
    for name in requested {
        let Some(row) = lookup(name) else { continue };
        let anchor = vertex_centroid(&row.row.geometry).ok_or_else(|| {
            GeotifyError::Render(format!("region '{}' has no vertices", name))
        })?;
        let color = match row.normalized {
            Some(n) => options.ramp.apply(n),
            None => options.missing_color,
        };
        glyphs.push(Glyph {
            region: name.clone(),
            anchor,
            width: options.width,
            height: row.scaled_height.unwrap_or(0.0),
            color,
        });
    }

    Ok(Placement { glyphs, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Values;
    use geo::{polygon, LineString, Polygon};

    fn square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
        ]])
    }

    fn row(name: &str, value: Option<f64>, matched: bool) -> JoinedRow {
        let mut values = Values::new();
        if matched {
            values.insert("pop".to_string(), value);
        }
        JoinedRow {
            name: name.to_string(),
            code: "11".to_string(),
            geometry: square(),
            key: matched.then(|| name.to_string()),
            values,
            matched,
        }
    }

    fn options(max: usize) -> GlyphOptions {
        GlyphOptions {
            ramp: ColorRamp::YlGnBu,
            missing_color: Rgba([211, 211, 211, 255]),
            width: 0.01,
            max_displayed_regions: max,
        }
    }

    #[test]
    fn normalizes_against_matched_max() {
        let rows = vec![row("A", Some(10.0), true), row("B", Some(30.0), true)];
        let scaled = scale_rows(&rows, "pop", 10.0);
        assert!((scaled[0].normalized.unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(scaled[1].normalized, Some(1.0));
        assert!((scaled[1].scaled_height.unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn normalized_stays_in_unit_interval() {
        let values = [0.0, 3.5, 12.0, 7.25, 12.0, 0.5];
        let rows: Vec<JoinedRow> = values
            .iter()
            .enumerate()
            .map(|(i, v)| row(&format!("R{i}"), Some(*v), true))
            .collect();
        let scaled = scale_rows(&rows, "pop", 10.0);
        for s in &scaled {
            let n = s.normalized.unwrap();
            assert!((0.0..=1.0).contains(&n));
        }
        assert_eq!(scaled[2].normalized, Some(1.0));
        assert_eq!(scaled[4].normalized, Some(1.0));
    }

    #[test]
    fn negative_values_under_positive_max_clamp_to_zero() {
        let rows = vec![row("A", Some(-10.0), true), row("B", Some(5.0), true)];
        let scaled = scale_rows(&rows, "pop", 10.0);
        assert_eq!(scaled[0].normalized, Some(0.0));
        assert_eq!(scaled[0].scaled_height, Some(0.0));
        assert_eq!(scaled[1].normalized, Some(1.0));
        assert_eq!(scaled[0].value, Some(-10.0));
    }

    #[test]
    fn all_negative_values_leave_everything_unnormalized() {
        let rows = vec![row("A", Some(-10.0), true), row("B", Some(-5.0), true)];
        let scaled = scale_rows(&rows, "pop", 10.0);
        assert!(scaled.iter().all(|s| s.normalized.is_none() && s.scaled_height.is_none()));
    }

    #[test]
    fn zero_max_leaves_everything_unnormalized() {
        let rows = vec![row("A", Some(0.0), true), row("B", Some(0.0), true)];
        let scaled = scale_rows(&rows, "pop", 10.0);
        assert!(scaled.iter().all(|s| s.normalized.is_none() && s.scaled_height.is_none()));
        assert_eq!(scaled[0].value, Some(0.0));
    }

    #[test]
    fn no_matched_rows_leaves_everything_unnormalized() {
        let rows = vec![row("A", None, false), row("B", None, false)];
        let scaled = scale_rows(&rows, "pop", 10.0);
        assert!(scaled.iter().all(|s| s.normalized.is_none()));
        assert!(scale_rows(&[], "pop", 10.0).is_empty());
    }

    #[test]
    fn missing_values_do_not_affect_max() {
        let rows = vec![
            row("A", Some(5.0), true),
            row("B", None, true),
            row("C", None, false),
        ];
        let scaled = scale_rows(&rows, "pop", 10.0);
        assert_eq!(scaled[0].normalized, Some(1.0));
        assert_eq!(scaled[1].normalized, None);
        assert_eq!(scaled[2].normalized, None);
        assert_eq!(scaled.len(), 3);
    }

    #[test]
    fn unknown_column_is_all_missing() {
        let rows = vec![row("A", Some(5.0), true)];
        let scaled = scale_rows(&rows, "density", 10.0);
        assert_eq!(scaled[0].value, None);
        assert_eq!(scaled[0].normalized, None);
    }

    #[test]
    fn centroid_of_square_is_its_center() {
        let c = vertex_centroid(&square()).unwrap();
        assert!((c.x() - 1.0).abs() < 1e-12);
        assert!((c.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn centroid_averages_vertices_not_area() {
        // Extra vertex along the bottom edge pulls the average, unlike an area centroid.
        let skewed = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 1.0, y: 0.0),
        ]]);
        let c = vertex_centroid(&skewed).unwrap();
        assert!((c.x() - 1.0).abs() < 1e-12);
        assert!((c.y() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn centroid_counts_holes_and_parts() {
        let with_hole = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)]),
            vec![LineString::from(vec![(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0), (1.0, 1.0)])],
        );
        let c = vertex_centroid(&MultiPolygon::new(vec![with_hole])).unwrap();
        // (0+0+4+4+1+1+2+2) / 8
        assert!((c.x() - 1.75).abs() < 1e-12);
        assert!((c.y() - 1.75).abs() < 1e-12);

        let empty: MultiPolygon<f64> = MultiPolygon::new(vec![]);
        assert!(vertex_centroid(&empty).is_none());
    }

    #[test]
    fn places_glyphs_in_request_order_with_duplicates() {
        let rows = scale_rows(&[row("A", Some(10.0), true), row("B", Some(30.0), true)], "pop", 10.0);
        let requested = vec!["B".to_string(), "A".to_string(), "B".to_string()];
        let placement = place_glyphs(&rows, &requested, &options(10)).unwrap();

        let names: Vec<&str> = placement.glyphs.iter().map(|g| g.region.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "B"]);
        assert!(placement.warnings.is_empty());

        let b = &placement.glyphs[0];
        assert_eq!(b.anchor, Point::new(1.0, 1.0));
        assert!((b.width - 0.01).abs() < 1e-12);
        assert!((b.height - 0.1).abs() < 1e-12);
        assert_eq!(b.color, ColorRamp::YlGnBu.apply(1.0));
    }

    #[test]
    fn missing_value_uses_missing_color() {
        let rows = scale_rows(&[row("A", None, true), row("B", Some(2.0), true)], "pop", 10.0);
        let placement = place_glyphs(&rows, &["A".to_string()], &options(10)).unwrap();
        assert_eq!(placement.glyphs[0].color, Rgba([211, 211, 211, 255]));
        assert_eq!(placement.glyphs[0].height, 0.0);
    }

    #[test]
    fn unknown_region_is_reported_by_name() {
        let rows = scale_rows(&[row("A", Some(1.0), true), row("U", None, false)], "pop", 10.0);
        let requested = vec!["A".to_string(), "평창군".to_string(), "U".to_string()];
        match place_glyphs(&rows, &requested, &options(10)) {
            Err(GeotifyError::RegionNotFound(names)) => {
                assert_eq!(names, vec!["평창군".to_string(), "U".to_string()]);
            }
            other => panic!("expected RegionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn over_cap_warns_but_keeps_every_glyph() {
        let rows = scale_rows(
            &[row("A", Some(1.0), true), row("B", Some(2.0), true), row("C", Some(3.0), true)],
            "pop",
            10.0,
        );
        let requested: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let placement = place_glyphs(&rows, &requested, &options(2)).unwrap();
        assert_eq!(placement.glyphs.len(), 3);
        assert_eq!(placement.warnings, vec![Warning::Legibility { requested: 3, max: 2 }]);
    }

    #[test]
    fn glyph_rect_stands_on_anchor() {
        let glyph = Glyph {
            region: "A".to_string(),
            anchor: Point::new(1.0, 1.0),
            width: 0.2,
            height: 0.5,
            color: Rgba([0, 0, 0, 255]),
        };
        let rect = glyph.rect();
        assert!((rect.min().x - 0.9).abs() < 1e-12);
        assert!((rect.max().x - 1.1).abs() < 1e-12);
        assert_eq!(rect.min().y, 1.0);
        assert_eq!(rect.max().y, 1.5);
    }
}
