//! Diagnostic context for interactive inspection.
//!
//! Holds the live map and tile layer, whose configurations are the startup
//! parameters, so they can be dumped from the UI. Created once when the application starts and dropped
//! at shutdown; map logic never reads from it.

use super::startup::MapSession;
use crate::geo::{Map, TileLayer};
use crate::scene::GeoEvent;
use serde::Serialize;
use serde_json::{json, Value};
use std::rc::Rc;
use web_time::{Duration, Instant};

pub struct DiagnosticContext {
    created_at: Instant,
    map: Rc<Map>,
    layer: Rc<TileLayer>,
}

impl DiagnosticContext {
    pub fn new(session: &MapSession) -> Self {
        log::debug!("Diagnostic context created");
        Self {
            created_at: Instant::now(),
            map: Rc::clone(&session.map),
            layer: Rc::clone(&session.layer),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Startup parameters plus the current view as JSON.
    pub fn snapshot(&self) -> Value {
        let center = self.map.center();
        let projection = self.map.projection();
        let level = self.layer.tile_level(projection.zoom);
        let center_tile = self.layer.tile_at(
            &projection,
            (projection.viewport / 2.0).to_pos2(),
            level,
        );
        let node = self.map.node();
        json!({
            "mapParams": to_json(self.map.config()),
            "layerParams": to_json(self.layer.config()),
            "view": {
                "node": node.id(),
                "center": { "x": center.x, "y": center.y },
                "zoom": self.map.zoom(),
                "size": { "width": node.width(), "height": node.height() },
                "classes": node.classes().collect::<Vec<_>>(),
                "projection": self.map.camera().projection.clone(),
            },
            "layer": {
                "kind": self.layer.kind(),
                "renderer": self.layer.renderer(),
                "urlTemplate": self.layer.url_template(),
                "level": level,
                "centerTileUrl": self.layer.tile_url(&center_tile),
                "children": self.layer.children().len(),
                "generation": self.layer.generation(),
                "panListeners": self.layer.listener_count(GeoEvent::Pan),
            },
            "uptimeSeconds": self.uptime().as_secs_f64(),
        })
    }

    /// Writes the snapshot to the log.
    pub fn log_snapshot(&self) {
        match serde_json::to_string_pretty(&self.snapshot()) {
            Ok(text) => log::info!("Diagnostics:\n{}", text),
            Err(e) => log::warn!("Failed to format diagnostics: {}", e),
        }
    }
}

impl Drop for DiagnosticContext {
    fn drop(&mut self) {
        log::debug!("Diagnostic context discarded after {:?}", self.uptime());
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        log::warn!("Failed to serialize diagnostics: {}", e);
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{QueryParams, StartupConfig};

    #[test]
    fn test_snapshot_reports_configuration() {
        let config = StartupConfig::from_query(&QueryParams::parse("renderer=html&debug=all"));
        let session = config.instantiate().unwrap();
        let diagnostics = DiagnosticContext::new(&session);

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot["mapParams"]["zoom"], json!(3.0));
        assert_eq!(snapshot["layerParams"]["renderer"], Value::Null);
        assert_eq!(snapshot["layer"]["kind"], json!("osm"));
        assert_eq!(snapshot["layer"]["generation"], json!(1));
        assert_eq!(snapshot["layer"]["panListeners"], json!(0));
        assert_eq!(snapshot["view"]["node"], json!("map"));
        assert_eq!(
            snapshot["view"]["classes"],
            json!(["debug-border", "debug-label"])
        );
        assert_eq!(snapshot["layer"]["level"], json!(3));
        assert_eq!(
            snapshot["layer"]["centerTileUrl"],
            json!("http://otile1.mqcdn.com/tiles/1.0.0/map/3/1/3.png")
        );
    }
}
