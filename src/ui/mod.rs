//! UI modules for the Tile Workbench application.
//!
//! The UI is split into distinct parts:
//! - Top bar: Title, renderer and camera summary, diagnostics
//! - Central canvas: Tile map with overlay widgets
//! - Widgets: Overlays anchored to geographic or viewport positions

mod canvas;
mod top_bar;
mod widget;

pub use canvas::render_canvas;
pub use top_bar::render_top_bar;
pub use widget::{PositionSource, Widget, WidgetArgs};
