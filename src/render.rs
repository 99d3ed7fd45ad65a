//! Drawing surfaces.
//!
//! The pipeline talks to a [`Surface`] in planar map coordinates. The raster
//! implementation fits the map extent into an RGBA image with `imageproc`.

use crate::error::{GeotifyError, GeotifyResult};
use geo::{Coord, LineString, MultiPolygon, Rect};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut, draw_text_mut};
use imageproc::point::Point as PixelPoint;
use rusttype::{Font, Scale};
use std::fs;
use std::path::Path;

const TITLE_SCALE: f32 = 28.0;

pub trait Surface {
    /// Map extent that subsequent draw calls are relative to.
    fn set_extent(&mut self, extent: Rect<f64>);
    fn fill_polygon(&mut self, geometry: &MultiPolygon<f64>, fill: Rgba<u8>);
    fn stroke_polygon(&mut self, geometry: &MultiPolygon<f64>, edge: Rgba<u8>);
    fn fill_rect(&mut self, rect: &Rect<f64>, fill: Rgba<u8>);
    fn title(&mut self, text: &str);
}

/// Map-to-pixel transform preserving aspect ratio, y axis pointing down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    min_x: f64,
    max_y: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Viewport {
    pub fn fit(extent: Rect<f64>, width: u32, height: u32, padding: u32) -> Self {
        let usable_w = (width as f64 - 2.0 * padding as f64).max(1.0);
        let usable_h = (height as f64 - 2.0 * padding as f64).max(1.0);
        let span_x = if extent.width() > 0.0 { extent.width() } else { 1.0 };
        let span_y = if extent.height() > 0.0 { extent.height() } else { 1.0 };
        let scale = (usable_w / span_x).min(usable_h / span_y);

        Self {
            min_x: extent.min().x,
            max_y: extent.max().y,
            scale,
            offset_x: padding as f64 + (usable_w - extent.width() * scale) / 2.0,
            offset_y: padding as f64 + (usable_h - extent.height() * scale) / 2.0,
        }
    }

    pub fn to_pixel(&self, c: Coord<f64>) -> (f32, f32) {
        let x = self.offset_x + (c.x - self.min_x) * self.scale;
        let y = self.offset_y + (self.max_y - c.y) * self.scale;
        (x as f32, y as f32)
    }
}

/// Smallest rectangle covering every rectangle given.
pub fn union_extent(rects: impl IntoIterator<Item = Rect<f64>>) -> Option<Rect<f64>> {
    rects.into_iter().reduce(|a, b| {
        Rect::new(
            (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
            (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
        )
    })
}

pub struct RasterSurface {
    image: RgbaImage,
    background: Rgba<u8>,
    padding: u32,
    viewport: Option<Viewport>,
    font: Option<Font<'static>>,
    title: Option<String>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, background: Rgba<u8>, padding: u32) -> Self {
        Self {
            image: ImageBuffer::from_pixel(width.max(1), height.max(1), background),
            background,
            padding,
            viewport: None,
            font: None,
            title: None,
        }
    }

    /// Load a TrueType font used to draw the title.
    pub fn with_font(mut self, path: &Path) -> GeotifyResult<Self> {
        let bytes = fs::read(path)
            .map_err(|e| GeotifyError::Render(format!("failed to read font {:?}: {}", path, e)))?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| GeotifyError::Render(format!("invalid font file {:?}", path)))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn save(&self, path: &Path) -> GeotifyResult<()> {
        self.image.save(path)?;
        Ok(())
    }

    fn ring_pixels(&self, ring: &LineString<f64>) -> Vec<PixelPoint<i32>> {
        let Some(viewport) = self.viewport else {
            return Vec::new();
        };
        let mut points: Vec<PixelPoint<i32>> = Vec::with_capacity(ring.0.len());
        for c in &ring.0 {
            let (x, y) = viewport.to_pixel(*c);
            let p = PixelPoint::new(x.round() as i32, y.round() as i32);
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        points
    }

    fn fill_ring(&mut self, ring: &LineString<f64>, color: Rgba<u8>) {
        let points = self.ring_pixels(ring);
        if points.len() >= 3 {
            draw_polygon_mut(&mut self.image, &points, color);
        }
    }
}

impl Surface for RasterSurface {
    fn set_extent(&mut self, extent: Rect<f64>) {
        let (w, h) = self.image.dimensions();
        self.viewport = Some(Viewport::fit(extent, w, h, self.padding));
    }

    fn fill_polygon(&mut self, geometry: &MultiPolygon<f64>, fill: Rgba<u8>) {
        for polygon in geometry {
            self.fill_ring(polygon.exterior(), fill);
            let background = self.background;
            for hole in polygon.interiors() {
                self.fill_ring(hole, background);
            }
        }
    }

    fn stroke_polygon(&mut self, geometry: &MultiPolygon<f64>, edge: Rgba<u8>) {
        let Some(viewport) = self.viewport else { return };
        for polygon in geometry {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                for line in ring.lines() {
                    draw_line_segment_mut(
                        &mut self.image,
                        viewport.to_pixel(line.start),
                        viewport.to_pixel(line.end),
                        edge,
                    );
                }
            }
        }
    }

    fn fill_rect(&mut self, rect: &Rect<f64>, fill: Rgba<u8>) {
        let Some(viewport) = self.viewport else { return };
        let (x0, y0) = viewport.to_pixel(Coord { x: rect.min().x, y: rect.max().y });
        let (x1, y1) = viewport.to_pixel(Coord { x: rect.max().x, y: rect.min().y });
        let w = ((x1 - x0).round() as i32).max(1) as u32;
        let h = ((y1 - y0).round() as i32).max(1) as u32;
        let pixel_rect = imageproc::rect::Rect::at(x0.round() as i32, y0.round() as i32).of_size(w, h);
        draw_filled_rect_mut(&mut self.image, pixel_rect, fill);
    }

    fn title(&mut self, text: &str) {
        self.title = Some(text.to_string());
        if let Some(font) = &self.font {
            let y = (self.padding as f32 - TITLE_SCALE).max(0.0) as i32;
            draw_text_mut(
                &mut self.image,
                Rgba([0, 0, 0, 255]),
                self.padding as i32,
                y,
                Scale::uniform(TITLE_SCALE),
                font,
                text,
            );
        }
    }
}
