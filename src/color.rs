//! Sequential color ramps and color parsing.
//!
//! Ramps are the 9-class ColorBrewer sequential palettes, linearly
//! interpolated between stops.

use crate::error::{GeotifyError, GeotifyResult};
use image::Rgba;

const YL_GN_BU: [u32; 9] = [
    0xffffd9, 0xedf8b1, 0xc7e9b4, 0x7fcdbb, 0x41b6c4, 0x1d91c0, 0x225ea8, 0x253494, 0x081d58,
];
const YL_OR_RD: [u32; 9] = [
    0xffffcc, 0xffeda0, 0xfed976, 0xfeb24c, 0xfd8d3c, 0xfc4e2a, 0xe31a1c, 0xbd0026, 0x800026,
];
const BLUES: [u32; 9] = [
    0xf7fbff, 0xdeebf7, 0xc6dbef, 0x9ecae1, 0x6baed6, 0x4292c6, 0x2171b5, 0x08519c, 0x08306b,
];
const GREENS: [u32; 9] = [
    0xf7fcf5, 0xe5f5e0, 0xc7e9c0, 0xa1d99b, 0x74c476, 0x41ab5d, 0x238b45, 0x006d2c, 0x00441b,
];
const REDS: [u32; 9] = [
    0xfff5f0, 0xfee0d2, 0xfcbba1, 0xfc9272, 0xfb6a4a, 0xef3b2c, 0xcb181d, 0xa50f15, 0x67000d,
];
const PURPLES: [u32; 9] = [
    0xfcfbfd, 0xefedf5, 0xdadaeb, 0xbcbddc, 0x9e9ac8, 0x807dba, 0x6a51a3, 0x54278f, 0x3f007d,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRamp {
    YlGnBu,
    YlOrRd,
    Blues,
    Greens,
    Reds,
    Purples,
}

impl ColorRamp {
    pub fn from_name(name: &str) -> GeotifyResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ylgnbu" => Ok(Self::YlGnBu),
            "ylorrd" => Ok(Self::YlOrRd),
            "blues" => Ok(Self::Blues),
            "greens" => Ok(Self::Greens),
            "reds" => Ok(Self::Reds),
            "purples" => Ok(Self::Purples),
            _ => Err(GeotifyError::InvalidConfig(format!("unknown color ramp '{}'", name))),
        }
    }

    fn stops(&self) -> &'static [u32; 9] {
        match self {
            Self::YlGnBu => &YL_GN_BU,
            Self::YlOrRd => &YL_OR_RD,
            Self::Blues => &BLUES,
            Self::Greens => &GREENS,
            Self::Reds => &REDS,
            Self::Purples => &PURPLES,
        }
    }

    /// Map `t` in [0, 1] to a color; values outside are clamped.
    pub fn apply(&self, t: f64) -> Rgba<u8> {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (stops.len() - 1) as f64;
        let lower = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - lower as f64;

        let a = rgb(stops[lower]);
        let b = rgb(stops[lower + 1]);
        let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        Rgba([lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2]), 255])
    }
}

fn rgb(hex: u32) -> [u8; 3] {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8]
}

/// Parse `#rrggbb`, `#rrggbbaa` or one of a few named colors.
pub fn parse_color(spec: &str) -> GeotifyResult<Rgba<u8>> {
    let spec = spec.trim();
    let named = match spec.to_ascii_lowercase().as_str() {
        "white" => Some(0xffffff),
        "black" => Some(0x000000),
        "red" => Some(0xff0000),
        "blue" => Some(0x0000ff),
        "green" => Some(0x008000),
        "lightblue" => Some(0xadd8e6),
        "lightgrey" | "lightgray" => Some(0xd3d3d3),
        "grey" | "gray" => Some(0x808080),
        _ => None,
    };
    if let Some(hex) = named {
        let [r, g, b] = rgb(hex);
        return Ok(Rgba([r, g, b, 255]));
    }

    let invalid = || GeotifyError::InvalidConfig(format!("invalid color '{}'", spec));
    let hex = spec.strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}
