//! Map and tile layer configuration.
//!
//! Optional fields are `None` when the startup query did not set them; the
//! effective values fall back to the defaults documented on each accessor.

use glam::DVec2;
use geo_types::Coord;
use serde::Serialize;

/// Default tile base URL used when no explicit template is configured.
pub const DEFAULT_BASE_URL: &str = "http://otile1.mqcdn.com/tiles/1.0.0/map/";

/// Default renderer for tile layers.
pub const DEFAULT_RENDERER: &str = "vgl";

/// Edge length of a tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Returns the pixel offset of tile (0, 0) relative to the world origin.
pub type TileOffsetFn = fn(level: u32) -> DVec2;

/// Offset used by pixel-coordinate maps: tile (0, 0) starts at the origin.
pub fn zero_tile_offset(_level: u32) -> DVec2 {
    DVec2::ZERO
}

/// Offset for the Web-Mercator world, which is centered on the origin.
pub fn centered_tile_offset(level: u32) -> DVec2 {
    DVec2::splat(TILE_SIZE / 2.0 * 2f64.powi(level as i32))
}

/// Pixel-space bounds of an image map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelBounds {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Options accepted by [`Map::new`](super::Map::new).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapConfig {
    /// Id of the root element hosting the map
    pub node: String,
    /// Initial center, in the map's geographic coordinate system
    pub center: Coord<f64>,
    pub zoom: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub clamp_bounds_x: Option<bool>,
    pub clamp_bounds_y: Option<bool>,
    pub clamp_zoom: Option<bool>,
    pub discrete_zoom: Option<bool>,
    /// Coordinate system of input coordinates
    pub ingcs: Option<String>,
    /// Coordinate system of the map
    pub gcs: Option<String>,
    pub max_bounds: Option<PixelBounds>,
    /// Map units per pixel at zoom level 0
    pub units_per_pixel: Option<f64>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            node: "map".to_string(),
            // Center of the continental US
            center: Coord { x: -98.0, y: 39.5 },
            zoom: 3.0,
            min: None,
            max: None,
            clamp_bounds_x: None,
            clamp_bounds_y: None,
            clamp_zoom: None,
            discrete_zoom: None,
            ingcs: None,
            gcs: None,
            max_bounds: None,
            units_per_pixel: None,
        }
    }
}

impl MapConfig {
    /// Minimum zoom level (default 0).
    pub fn min_zoom(&self) -> f64 {
        self.min.unwrap_or(0.0)
    }

    /// Maximum zoom level (default 16).
    pub fn max_zoom(&self) -> f64 {
        self.max.unwrap_or(16.0)
    }

    /// Clamp horizontal panning to the world (default false).
    pub fn clamps_x(&self) -> bool {
        self.clamp_bounds_x.unwrap_or(false)
    }

    /// Clamp vertical panning to the world (default true).
    pub fn clamps_y(&self) -> bool {
        self.clamp_bounds_y.unwrap_or(true)
    }

    /// Prevent zooming out past the point where the world fills the view (default true).
    pub fn clamps_zoom(&self) -> bool {
        self.clamp_zoom.unwrap_or(true)
    }

    pub fn is_discrete_zoom(&self) -> bool {
        self.discrete_zoom.unwrap_or(false)
    }

    /// True when the map uses pixel (image) coordinates.
    pub fn is_pixel_mode(&self) -> bool {
        self.units_per_pixel.is_some()
    }
}

/// Where a tile layer loads its tiles from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TileSource {
    /// Full URL template with `{z}`, `{x}`, `{y}` and optionally `{s}`
    Template(String),
    /// Base URL; `{z}/{x}/{y}.png` is appended
    BaseUrl(String),
}

impl Default for TileSource {
    fn default() -> Self {
        TileSource::BaseUrl(DEFAULT_BASE_URL.to_string())
    }
}

/// Options accepted by [`Map::create_layer`](super::Map::create_layer).
#[derive(Debug, Clone, Serialize)]
pub struct LayerConfig {
    /// Renderer name, `None` for the HTML renderer
    pub renderer: Option<String>,
    /// CSS-style opacity; NaN when the query value was malformed
    pub opacity: f32,
    pub source: TileSource,
    pub subdomains: Option<Vec<String>>,
    pub keep_lower: Option<bool>,
    pub wrap_x: Option<bool>,
    pub wrap_y: Option<bool>,
    pub clamp_bounds_x: Option<bool>,
    pub min_level: Option<f64>,
    pub max_level: Option<f64>,
    #[serde(skip)]
    pub tile_offset: Option<TileOffsetFn>,
    pub attribution: Option<String>,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            renderer: Some(DEFAULT_RENDERER.to_string()),
            opacity: 1.0,
            source: TileSource::default(),
            subdomains: None,
            keep_lower: None,
            wrap_x: None,
            wrap_y: None,
            clamp_bounds_x: None,
            min_level: None,
            max_level: None,
            tile_offset: None,
            attribution: None,
        }
    }
}
