//! Central canvas UI: tile map and overlay widgets.

use super::widget::{CssPosition, Widget, WidgetState};
use crate::geo::{render_features, render_tile_layer, Map};
use crate::scene::{FeatureArgs, FeatureStyle};
use crate::state::{AppState, MapSession};
use eframe::egui::{self, Color32, FontId, Painter, Pos2, Rect, RichText, Sense, Stroke, Vec2};

/// Padding around widget labels, in pixels.
const WIDGET_PADDING: Vec2 = Vec2::new(6.0, 3.0);

/// Render the map canvas with its tile layer and widgets.
pub fn render_canvas(
    ctx: &egui::Context,
    state: &mut AppState,
    session: &MapSession,
    widgets: &[Widget],
) {
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            let available_size = ui.available_size();

            // Allocate the full available space for the canvas
            let (response, painter) =
                ui.allocate_painter(available_size, Sense::click_and_drag());
            let rect = response.rect;

            // Draw background
            painter.rect_filled(rect, 0.0, Color32::from_rgb(20, 20, 35));

            // Widgets only follow pans, so realign them after a resize
            if session.map.set_viewport_size(rect.size()) {
                for widget in widgets {
                    widget.position_maybe();
                }
            }

            render_tile_layer(&painter, rect.min, &session.map, &session.layer);

            for widget in widgets.iter().filter(|w| w.state() == WidgetState::Active) {
                // Features project through their own widget's layer
                if let Some(map) = widget.layer().map() {
                    render_features(&painter, rect.min, &map, &widget.features());
                }
                render_widget(&painter, rect.min, widget);
                if widget.is_dirty() {
                    log::trace!("Widget {:?} redrawn after modification", widget.id());
                    widget.clear_dirty();
                }
            }
            state.widgets_in_view = widgets.iter().filter(|w| w.is_in_viewport()).count();

            draw_overlay_info(ui, &rect, &session.map);

            handle_canvas_interaction(&response, &rect, &session.map);

            if let Some(widget) = widgets.first() {
                handle_pin_drop(&response, &rect, state, &session.map, widget);
            }
        });
}

/// Moves the pin feature to the right-clicked position.
fn handle_pin_drop(
    response: &egui::Response,
    rect: &Rect,
    state: &mut AppState,
    map: &Map,
    widget: &Widget,
) {
    if !response.secondary_clicked() {
        return;
    }
    let Some(pos) = response.interact_pointer_pos() else {
        return;
    };

    if let Some(previous) = state.pin.take() {
        widget.delete_feature(&previous);
    }

    let coord = map.display_to_gcs((pos - rect.min).to_pos2());
    let args = FeatureArgs {
        coordinates: vec![coord],
        style: FeatureStyle {
            color: Color32::from_rgb(90, 180, 250),
            radius: 5.0,
            ..Default::default()
        },
    };
    match widget.create_feature("point", args) {
        Ok(feature) => {
            state.status_message = format!("Pin at {:.4}, {:.4}", coord.x, coord.y);
            state.pin = Some(feature);
        }
        Err(e) => log::warn!("Failed to drop pin: {}", e),
    }
}

/// Draws a widget's overlay element at its last applied position.
fn render_widget(painter: &Painter, origin: Pos2, widget: &Widget) {
    let Some(element) = widget.element() else {
        return;
    };
    let style = element.style();
    let offset = match style.position {
        CssPosition::Relative => Vec2::new(style.left, style.top),
        CssPosition::Static => Vec2::ZERO,
    };

    let galley = painter.layout_no_wrap(
        element.label().to_string(),
        FontId::proportional(12.0),
        Color32::WHITE,
    );
    let min = origin + offset;
    let frame = Rect::from_min_size(min, galley.size() + WIDGET_PADDING * 2.0);

    painter.rect_filled(frame, 3.0, Color32::from_rgba_unmultiplied(10, 10, 20, 200));
    painter.rect_stroke(
        frame,
        3.0,
        Stroke::new(1.0, Color32::from_rgb(230, 120, 40)),
        egui::StrokeKind::Inside,
    );
    painter.galley(min + WIDGET_PADDING, galley, Color32::WHITE);
}

fn draw_overlay_info(ui: &mut egui::Ui, rect: &Rect, map: &Map) {
    let overlay_pos = rect.left_top() + Vec2::new(10.0, 10.0);

    // Create a small overlay area
    let overlay_rect = Rect::from_min_size(overlay_pos, Vec2::new(220.0, 50.0));
    let center = map.center();

    ui.scope_builder(egui::UiBuilder::new().max_rect(overlay_rect), |ui| {
        ui.vertical(|ui| {
            ui.label(
                RichText::new(format!("Center: {:.4}, {:.4}", center.x, center.y))
                    .monospace()
                    .size(12.0)
                    .color(Color32::from_rgb(200, 200, 220)),
            );
            ui.label(
                RichText::new(format!("Zoom: {:.2}", map.zoom()))
                    .monospace()
                    .size(12.0)
                    .color(Color32::from_rgb(200, 200, 220)),
            );
        });
    });
}

fn handle_canvas_interaction(response: &egui::Response, rect: &Rect, map: &Map) {
    // Handle dragging for panning
    if response.dragged() {
        let delta = response.drag_delta();
        if delta != Vec2::ZERO {
            map.pan(delta);
        }
    }

    // Handle scroll for zooming relative to cursor position
    if response.hovered() {
        let scroll_delta = response.ctx.input(|i| i.raw_scroll_delta);
        if scroll_delta.y != 0.0 {
            let zoom_factor = 1.0 + scroll_delta.y as f64 * 0.001;
            let anchor = response
                .hover_pos()
                .map(|pos| (pos - rect.min).to_pos2())
                .unwrap_or_else(|| (rect.size() / 2.0).to_pos2());
            map.zoom_about(zoom_factor, anchor);
        }
    }

    // Step zoom with +/- while hovering
    if response.hovered() {
        let (zoom_in, zoom_out) = response.ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals),
                i.key_pressed(egui::Key::Minus),
            )
        });
        if zoom_in {
            map.set_zoom(map.zoom().floor() + 1.0);
        } else if zoom_out {
            map.set_zoom(map.zoom().ceil() - 1.0);
        }
    }

    // Reset view on double-click
    if response.double_clicked() {
        map.reset_view();
    }
}
