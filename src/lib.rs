//! Choropleth and bar-overlay maps of South Korean administrative regions.
//!
//! A polygon source and a statistics table are joined on region name, the
//! chosen value column is normalized against its maximum, and the result is
//! drawn onto a [`render::Surface`] with one bar glyph per requested region.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod join;
pub mod processing;
pub mod province;
pub mod render;
pub mod types;
pub mod visualizer;

pub use error::{GeotifyError, GeotifyResult};
pub use visualizer::{Frame, Visualization, Visualizer};
