//! Tile layer and feature rendering.
//!
//! Renders the tile grid and widget features to the egui canvas. Tiles are
//! not fetched; each one is drawn as a shaded placeholder cell.

use super::layer::{TileIndex, TileLayer};
use super::map::{Map, DEBUG_BORDER_CLASS, DEBUG_LABEL_CLASS};
use super::projection::MapProjection;
use crate::scene::{Feature, FeatureKind};
use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Stroke, Vec2};
use std::rc::Rc;

/// Renders every visible level of a tile layer.
///
/// `origin` is the screen position of the viewport's top-left corner.
pub fn render_tile_layer(painter: &Painter, origin: Pos2, map: &Map, layer: &TileLayer) {
    let projection = map.projection();
    let (show_labels, show_borders) = {
        let node = map.node();
        // Debug classes only style the HTML renderer's tile elements
        let html = layer.renderer().is_none();
        (
            html && node.has_class(DEBUG_LABEL_CLASS),
            html && node.has_class(DEBUG_BORDER_CLASS),
        )
    };
    let opacity = layer.opacity();
    let top_level = layer.tile_level(projection.zoom);

    // Render levels in order (back to front)
    for level in layer.levels_to_draw(projection.zoom) {
        for tile in layer.visible_tiles(&projection, level) {
            let rect = layer
                .tile_display_rect(&projection, &tile)
                .translate(origin.to_vec2());
            painter.rect_filled(rect, 0.0, tile_color(&tile).gamma_multiply(opacity));

            if level != top_level {
                continue;
            }
            if show_borders {
                painter.rect_stroke(
                    rect,
                    0.0,
                    Stroke::new(1.0, Color32::from_rgb(200, 60, 60)),
                    eframe::egui::StrokeKind::Inside,
                );
            }
            if show_labels {
                let (x, y) = tile.wrapped();
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    format!("{}/{}/{}", tile.level, x, y),
                    FontId::monospace(12.0),
                    Color32::from_rgb(220, 220, 240),
                );
            }
        }
    }

    render_attribution(painter, origin, &projection, layer.attribution());
}

/// Checkerboard shade for a tile placeholder.
fn tile_color(tile: &TileIndex) -> Color32 {
    let (x, y) = tile.wrapped();
    let base = if (x + y) % 2 == 0 { 46 } else { 38 };
    let level_tint = (tile.level.min(18) * 3) as u8;
    Color32::from_rgb(base, base + level_tint / 2, base + 12 + level_tint)
}

fn render_attribution(painter: &Painter, origin: Pos2, projection: &MapProjection, text: &str) {
    if text.is_empty() {
        return;
    }
    let corner = origin + projection.viewport - Vec2::new(6.0, 4.0);
    painter.text(
        corner,
        Align2::RIGHT_BOTTOM,
        text,
        FontId::proportional(10.0),
        Color32::from_rgb(160, 160, 180),
    );
}

/// Renders widget features in display space.
pub fn render_features(painter: &Painter, origin: Pos2, map: &Map, features: &[Rc<Feature>]) {
    let projection = map.projection();

    for feature in features.iter().filter(|f| f.is_active()) {
        let style = feature.args().style;
        let stroke = Stroke::new(style.width, style.color);
        let display: Vec<Pos2> = feature
            .args()
            .coordinates
            .iter()
            .map(|c| projection.gcs_to_display(*c))
            .collect();
        let points: Vec<Pos2> = display.iter().map(|p| *p + origin.to_vec2()).collect();

        match feature.kind() {
            FeatureKind::Point => {
                for (pos, screen) in display.iter().zip(&points) {
                    if projection.is_visible(*pos, style.radius) {
                        painter.circle_filled(*screen, style.radius, style.color);
                    }
                }
            }
            FeatureKind::Line => render_line_string(painter, &points, stroke),
            FeatureKind::Polygon => {
                // Only the outline is drawn; filling would require tessellation
                render_line_string(painter, &points, stroke);
                if let (Some(first), Some(last)) = (points.first(), points.last()) {
                    if points.len() > 2 {
                        painter.line_segment([*last, *first], stroke);
                    }
                }
            }
        }
    }
}

/// Renders a line string, skipping sub-pixel segments.
fn render_line_string(painter: &Painter, points: &[Pos2], stroke: Stroke) {
    for window in points.windows(2) {
        if let [p1, p2] = window {
            let dist_sq = (p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2);
            if dist_sq > 0.5 {
                painter.line_segment([*p1, *p2], stroke);
            }
        }
    }
}
