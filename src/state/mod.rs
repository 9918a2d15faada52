//! Application state management.
//!
//! Startup configuration comes from the URL query string; the diagnostic
//! context and the status shown in the top bar live here as well.

mod diagnostics;
mod startup;
mod url_state;

pub use diagnostics::DiagnosticContext;
pub use startup::{MapSession, StartupConfig};
pub use url_state::{parse_from_url, QueryParams};

use crate::scene::Feature;
use std::rc::Rc;

/// Root application state shown by the UI panels.
#[derive(Default)]
pub struct AppState {
    /// Application status message displayed in top bar
    pub status_message: String,

    /// Number of widgets whose anchor was inside the viewport last frame
    pub widgets_in_view: usize,

    /// Point feature dropped with a right click
    pub pin: Option<Rc<Feature>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            status_message: "Ready".to_string(),
            ..Default::default()
        }
    }
}
