use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that replaces `input.geojson` when set.
pub const GEOJSON_ENV_VAR: &str = "GEOTIFY_GEOJSON_FILE";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub join: JoinConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub glyph: GlyphConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Polygon source (.json, .geojson or .shp).
    pub geojson: PathBuf,
    pub data_csv: PathBuf,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_name_property")]
    pub name_property: String,
    #[serde(default = "default_code_property")]
    pub code_property: String,
    /// Truncate feature codes to this many characters before filtering.
    pub code_length: Option<usize>,
    pub key_column: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct JoinConfig {
    pub region_code: Option<String>,
    pub value_column: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StyleConfig {
    #[serde(default = "default_color_ramp")]
    pub color_ramp: String,
    #[serde(default = "default_missing_color")]
    pub missing_color: String,
    #[serde(default = "default_missing_edge_color")]
    pub missing_edge_color: String,
    #[serde(default = "default_edge_color")]
    pub edge_color: String,
    #[serde(default = "default_background")]
    pub background: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GlyphConfig {
    #[serde(default = "default_max_displayed_regions")]
    pub max_displayed_regions: usize,
    #[serde(default = "default_glyph_width")]
    pub width: f64,
    #[serde(default = "default_height_divisor")]
    pub height_divisor: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_image_size")]
    pub width: u32,
    #[serde(default = "default_image_size")]
    pub height: u32,
    #[serde(default = "default_padding")]
    pub padding: u32,
    pub title_font: Option<PathBuf>,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_name_property() -> String {
    "name".to_string()
}

fn default_code_property() -> String {
    "code".to_string()
}

fn default_color_ramp() -> String {
    "YlGnBu".to_string()
}

fn default_missing_color() -> String {
    "lightgrey".to_string()
}

fn default_missing_edge_color() -> String {
    "red".to_string()
}

fn default_edge_color() -> String {
    "black".to_string()
}

fn default_background() -> String {
    "white".to_string()
}

fn default_max_displayed_regions() -> usize {
    10
}

fn default_glyph_width() -> f64 {
    0.01
}

fn default_height_divisor() -> f64 {
    10.0
}

fn default_image_size() -> u32 {
    1000
}

fn default_padding() -> u32 {
    20
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            color_ramp: default_color_ramp(),
            missing_color: default_missing_color(),
            missing_edge_color: default_missing_edge_color(),
            edge_color: default_edge_color(),
            background: default_background(),
        }
    }
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            max_displayed_regions: default_max_displayed_regions(),
            width: default_glyph_width(),
            height_divisor: default_height_divisor(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_image_size(),
            height: default_image_size(),
            padding: default_padding(),
            title_font: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Apply the `GEOTIFY_GEOJSON_FILE` override. Call once, before loading.
    pub fn resolve_env_overrides(&mut self) {
        self.apply_geojson_override(std::env::var_os(GEOJSON_ENV_VAR).map(PathBuf::from));
    }

    fn apply_geojson_override(&mut self, override_path: Option<PathBuf>) {
        if let Some(path) = override_path.filter(|p| !p.as_os_str().is_empty()) {
            tracing::info!("Using polygon source from {}: {:?}", GEOJSON_ENV_VAR, path);
            self.input.geojson = path;
        }
    }
}
