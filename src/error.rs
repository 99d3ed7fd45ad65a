//! Error types for the geotify pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using GeotifyError.
pub type GeotifyResult<T> = Result<T, GeotifyError>;

/// Primary error type for loading and visualization.
#[derive(Debug, Error)]
pub enum GeotifyError {
    // === Loader Errors ===
    #[error("Input file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Invalid input {path:?}: {message}")]
    InvalidFormat { path: PathBuf, message: String },

    #[error("Could not decode {path:?} as any of: {}", .tried.join(", "))]
    Encoding { path: PathBuf, tried: Vec<String> },

    // === Pipeline Errors ===
    #[error("Region(s) not found among matched rows: {}", .0.join(", "))]
    RegionNotFound(Vec<String>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rendering failed: {0}")]
    Render(String),
}

impl GeotifyError {
    pub(crate) fn invalid_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GeotifyError::InvalidFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors raised while loading sources, which abort construction.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            GeotifyError::NotFound(_)
                | GeotifyError::InvalidFormat { .. }
                | GeotifyError::Encoding { .. }
        )
    }
}

impl From<image::ImageError> for GeotifyError {
    fn from(err: image::ImageError) -> Self {
        GeotifyError::Render(err.to_string())
    }
}
