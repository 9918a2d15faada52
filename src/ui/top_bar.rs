//! Top bar UI: app title, layer summary, and status.

use crate::state::{AppState, DiagnosticContext, MapSession};
use eframe::egui::{self, Color32, RichText};

pub fn render_top_bar(
    ctx: &egui::Context,
    state: &mut AppState,
    session: &MapSession,
    diagnostics: &DiagnosticContext,
) {
    egui::TopBottomPanel::top("top_bar")
        .exact_height(36.0)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                // App title
                ui.label(
                    RichText::new("Tile Workbench")
                        .strong()
                        .size(16.0)
                        .color(Color32::WHITE),
                );

                ui.separator();

                let renderer = session.layer.renderer().unwrap_or("html");
                let projection = session.map.camera().projection.clone();
                ui.label(
                    RichText::new(format!(
                        "Renderer: {}  Camera: {}  Level: {}",
                        renderer,
                        projection,
                        session.layer.tile_level(session.map.zoom())
                    ))
                    .monospace()
                    .size(12.0)
                    .color(Color32::GRAY),
                );

                ui.separator();

                if ui.button("Log diagnostics").clicked() {
                    diagnostics.log_snapshot();
                    state.status_message = "Diagnostics written to log".to_string();
                }

                ui.separator();

                // Status text
                ui.label(
                    RichText::new(format!(
                        "{} ({} widgets in view)",
                        state.status_message, state.widgets_in_view
                    ))
                    .size(13.0)
                    .color(Color32::GRAY),
                );
            });
        });
}
