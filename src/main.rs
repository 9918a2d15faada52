#![warn(clippy::all)]

//! Tile Workbench - A tile map viewer configured from the URL query string.
//!
//! The map, its tile layer and the debug overlays are built from query
//! parameters at startup. Overlay widgets stay anchored to geographic or
//! viewport positions while the map is panned and zoomed.

mod geo;
mod scene;
mod state;
mod ui;

use eframe::egui;
use geo_types::Coord;
use scene::{FeatureArgs, SceneError};
use state::{AppState, DiagnosticContext, MapSession, StartupConfig};
use ui::{PositionSource, Widget, WidgetArgs};

// Native entry point
#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let native_options = eframe::NativeOptions::default();

    eframe::run_native(
        "Tile Workbench",
        native_options,
        Box::new(|cc| Ok(Box::new(TileWorkbenchApp::new(cc)?))),
    )
}

// WASM entry point - main is not called on wasm32
#[cfg(target_arch = "wasm32")]
fn main() {}

/// Entry point for the WASM application.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub async fn start() {
    use eframe::wasm_bindgen::JsCast as _;

    // Redirect `log` messages to `console.log`:
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();

    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async {
        let document = web_sys::window()
            .expect("No window")
            .document()
            .expect("No document");

        let canvas = document
            .get_element_by_id("map")
            .expect("Failed to find map")
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .expect("map was not a HtmlCanvasElement");

        let start_result = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(TileWorkbenchApp::new(cc)?))),
            )
            .await;

        // Remove the loading text once the app has loaded:
        if let Some(loading_text) = document.get_element_by_id("loading_text") {
            match start_result {
                Ok(_) => {
                    loading_text.remove();
                }
                Err(e) => {
                    loading_text.set_inner_html(
                        "<p>The app has crashed. See the developer console for details.</p>",
                    );
                    panic!("Failed to start eframe: {e:?}");
                }
            }
        }
    });
}

/// Main application state and logic.
pub struct TileWorkbenchApp {
    /// Status shown in the top bar
    state: AppState,

    /// Map and tile layer built from the query string
    session: MapSession,

    /// Overlay widgets attached to the tile layer, torn down when dropped
    widgets: Vec<Widget>,

    /// Live map objects for the diagnostics button
    diagnostics: DiagnosticContext,
}

impl TileWorkbenchApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Result<Self, SceneError> {
        let query = state::parse_from_url();
        log::debug!("Startup query has {} parameters", query.len());

        let config = StartupConfig::from_query(&query);
        let session = config.instantiate()?;
        log::info!(
            "Created map centered on ({}, {}) at zoom {}",
            config.map.center.x,
            config.map.center.y,
            session.map.zoom()
        );

        let diagnostics = DiagnosticContext::new(&session);
        let widgets = create_demo_widgets(&session, config.map.center)?;

        Ok(Self {
            state: AppState::new(),
            session,
            widgets,
            diagnostics,
        })
    }
}

/// One widget pinned to the initial map center and one pinned to the viewport.
fn create_demo_widgets(session: &MapSession, center: Coord<f64>) -> Result<Vec<Widget>, SceneError> {
    let center_widget = Widget::new(
        WidgetArgs::new(session.layer.clone())
            .with_position(PositionSource::Geographic(center))
            .with_label("Center"),
    );
    center_widget.create_feature("point", FeatureArgs::new(vec![center]))?;

    let viewport_widget = Widget::new(
        WidgetArgs::new(session.layer.clone())
            .with_position(PositionSource::Fixed(egui::pos2(12.0, 64.0)))
            .with_label("Drag to pan, scroll to zoom, double-click to reset"),
    );

    let widgets = vec![center_widget, viewport_widget];
    for widget in &widgets {
        widget.position_maybe();
    }
    Ok(widgets)
}

impl eframe::App for TileWorkbenchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::render_top_bar(ctx, &mut self.state, &self.session, &self.diagnostics);
        ui::render_canvas(ctx, &mut self.state, &self.session, &self.widgets);
    }
}
