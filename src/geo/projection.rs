//! Map projection and coordinate transformation.
//!
//! Handles converting between geographic coordinates, world coordinates and
//! display coordinates.
//!
//! World coordinates are pixels at zoom level 0. Display coordinates are
//! pixels relative to the top-left corner of the map viewport, so the
//! viewport always spans `[0, width] x [0, height]`.

use super::config::{MapConfig, PixelBounds, TILE_SIZE};
use eframe::egui::{Pos2, Vec2};
use geo_types::Coord;
use glam::DVec2;
use std::f64::consts::PI;

/// Latitude limit of the Web-Mercator square.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// How geographic coordinates map onto the world plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateMode {
    /// Longitude/latitude in degrees, Web-Mercator world
    Geographic,
    /// Image pixels with the origin at the top-left and y growing downward
    Pixel {
        /// Image units per world pixel at zoom level 0
        units_per_pixel: f64,
        bounds: Option<PixelBounds>,
    },
}

impl CoordinateMode {
    pub fn from_config(config: &MapConfig) -> Self {
        match config.units_per_pixel {
            Some(units_per_pixel) => CoordinateMode::Pixel {
                units_per_pixel,
                bounds: config.max_bounds,
            },
            None => CoordinateMode::Geographic,
        }
    }
}

/// Map projection for converting geographic to display coordinates.
#[derive(Debug, Clone)]
pub struct MapProjection {
    /// Geographic coordinate shown at the viewport center (before panning)
    pub center: Coord<f64>,
    /// Current zoom level; one level doubles the scale
    pub zoom: f64,
    /// Pan offset in display pixels
    pub pan_offset: Vec2,
    /// Size of the viewport in pixels
    pub viewport: Vec2,
    pub mode: CoordinateMode,
}

impl Default for MapProjection {
    fn default() -> Self {
        Self {
            center: Coord { x: -98.0, y: 39.5 },
            zoom: 3.0,
            pan_offset: Vec2::ZERO,
            viewport: Vec2::new(800.0, 600.0),
            mode: CoordinateMode::Geographic,
        }
    }
}

impl MapProjection {
    /// Creates a projection for the given map configuration.
    pub fn from_config(config: &MapConfig) -> Self {
        Self {
            center: config.center,
            zoom: config.zoom,
            mode: CoordinateMode::from_config(config),
            ..Default::default()
        }
    }

    /// Display pixels per world pixel.
    pub fn scale(&self) -> f64 {
        2f64.powf(self.zoom)
    }

    /// Converts a geographic coordinate to world coordinates.
    pub fn gcs_to_world(&self, coord: Coord<f64>) -> DVec2 {
        match self.mode {
            CoordinateMode::Geographic => {
                let lat = coord.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
                let x = coord.x / 360.0 * TILE_SIZE;
                let merc = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
                // Flip Y since display Y increases downward
                let y = -merc / (2.0 * PI) * TILE_SIZE;
                DVec2::new(x, y)
            }
            CoordinateMode::Pixel {
                units_per_pixel, ..
            } => DVec2::new(coord.x, coord.y) / units_per_pixel,
        }
    }

    /// Converts world coordinates back to a geographic coordinate.
    pub fn world_to_gcs(&self, world: DVec2) -> Coord<f64> {
        match self.mode {
            CoordinateMode::Geographic => {
                let lon = world.x / TILE_SIZE * 360.0;
                let merc = -world.y / TILE_SIZE * 2.0 * PI;
                let lat = (2.0 * merc.exp().atan() - PI / 2.0).to_degrees();
                Coord { x: lon, y: lat }
            }
            CoordinateMode::Pixel {
                units_per_pixel, ..
            } => {
                let p = world * units_per_pixel;
                Coord { x: p.x, y: p.y }
            }
        }
    }

    /// Display position of the viewport center, including the pan offset.
    fn display_center(&self) -> DVec2 {
        DVec2::new(
            (self.viewport.x / 2.0 + self.pan_offset.x) as f64,
            (self.viewport.y / 2.0 + self.pan_offset.y) as f64,
        )
    }

    pub fn world_to_display(&self, world: DVec2) -> Pos2 {
        let center = self.gcs_to_world(self.center);
        let p = (world - center) * self.scale() + self.display_center();
        Pos2::new(p.x as f32, p.y as f32)
    }

    pub fn display_to_world(&self, pos: Pos2) -> DVec2 {
        let center = self.gcs_to_world(self.center);
        let p = DVec2::new(pos.x as f64, pos.y as f64);
        (p - self.display_center()) / self.scale() + center
    }

    /// Converts a geographic coordinate to a display position.
    pub fn gcs_to_display(&self, coord: Coord<f64>) -> Pos2 {
        self.world_to_display(self.gcs_to_world(coord))
    }

    /// Converts a display position to a geographic coordinate.
    pub fn display_to_gcs(&self, pos: Pos2) -> Coord<f64> {
        self.world_to_gcs(self.display_to_world(pos))
    }

    /// World-space extent of the map as (min, max), if the world is bounded.
    pub fn world_bounds(&self) -> Option<(DVec2, DVec2)> {
        match self.mode {
            CoordinateMode::Geographic => Some((
                DVec2::splat(-TILE_SIZE / 2.0),
                DVec2::splat(TILE_SIZE / 2.0),
            )),
            CoordinateMode::Pixel {
                units_per_pixel,
                bounds,
            } => bounds.map(|b| {
                (
                    DVec2::new(b.left, b.top) / units_per_pixel,
                    DVec2::new(b.right, b.bottom) / units_per_pixel,
                )
            }),
        }
    }

    /// World-space extent of the viewport as (min, max).
    pub fn visible_world(&self) -> (DVec2, DVec2) {
        let top_left = self.display_to_world(Pos2::ZERO);
        let bottom_right = self.display_to_world(Pos2::new(self.viewport.x, self.viewport.y));
        (top_left.min(bottom_right), top_left.max(bottom_right))
    }

    /// Checks if a display position lies within the viewport (with margin).
    pub fn is_visible(&self, pos: Pos2, margin_px: f32) -> bool {
        pos.x >= -margin_px
            && pos.y >= -margin_px
            && pos.x <= self.viewport.x + margin_px
            && pos.y <= self.viewport.y + margin_px
    }
}
