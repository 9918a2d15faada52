//! Map, camera and tile layer system.
//!
//! This module provides the map the startup configuration builds, the tile
//! layer attached to it, coordinate conversion between geographic and
//! display space, and rendering of tiles and features to the canvas.

mod config;
mod layer;
mod map;
mod projection;
mod renderer;

pub use config::{
    zero_tile_offset, LayerConfig, MapConfig, PixelBounds, TileSource, DEFAULT_BASE_URL,
    DEFAULT_RENDERER,
};
pub use layer::{TileIndex, TileLayer};
pub use map::{Map, DEBUG_BORDER_CLASS, DEBUG_LABEL_CLASS};
pub use renderer::{render_features, render_tile_layer};
