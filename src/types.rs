use geo::{MultiPolygon, Point, Rect};
use image::Rgba;
use std::collections::BTreeMap;
use std::fmt;

/// Column name -> numeric cell, `None` where the cell is empty or not a number.
pub type Values = BTreeMap<String, Option<f64>>;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub name: String,
    pub code: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    pub key: String,
    pub values: Values,
}

impl RegionRecord {
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

/// One row of the left outer join of features and records.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub name: String,
    pub code: String,
    pub geometry: MultiPolygon<f64>,
    /// Key of the matching record; `None` when unmatched.
    pub key: Option<String>,
    pub values: Values,
    pub matched: bool,
}

impl JoinedRow {
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaledRow {
    pub row: JoinedRow,
    pub value: Option<f64>,
    /// `value / max`, `None` when the value is missing or the max is zero.
    pub normalized: Option<f64>,
    pub scaled_height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub region: String,
    pub anchor: Point<f64>,
    pub width: f64,
    pub height: f64,
    pub color: Rgba<u8>,
}

impl Glyph {
    /// Bar rectangle standing on the anchor, horizontally centred.
    pub fn rect(&self) -> Rect<f64> {
        let half = self.width / 2.0;
        Rect::new(
            (self.anchor.x() - half, self.anchor.y()),
            (self.anchor.x() + half, self.anchor.y() + self.height),
        )
    }
}

/// Non-fatal conditions reported alongside a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    EmptyResult { context: String },
    Legibility { requested: usize, max: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyResult { context } => write!(f, "empty result: {}", context),
            Warning::Legibility { requested, max } => write!(
                f,
                "{} regions requested, more than {} may not render legibly",
                requested, max
            ),
        }
    }
}
