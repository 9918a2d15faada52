//! The map: camera, viewport, root node and the layers drawn on it.

use super::config::{LayerConfig, MapConfig};
use super::layer::{LayerId, TileLayer};
use super::projection::MapProjection;
use crate::scene::{EventArgs, GeoEvent, SceneError};
use eframe::egui::{Pos2, Vec2};
use geo_types::Coord;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Class enabling tile label debugging on the root node.
pub const DEBUG_LABEL_CLASS: &str = "debug-label";
/// Class enabling tile border debugging on the root node.
pub const DEBUG_BORDER_CLASS: &str = "debug-border";

/// Root element hosting the map.
#[derive(Debug, Clone)]
pub struct MapNode {
    id: String,
    width: f32,
    height: f32,
    classes: BTreeSet<String>,
}

impl MapNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    fn toggle_class(&mut self, name: &str, on: bool) {
        if on {
            self.classes.insert(name.to_string());
        } else {
            self.classes.remove(name);
        }
    }
}

/// Camera settings that cannot be expressed in [`MapConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera projection name, e.g. `parallel` or `projection`
    pub projection: String,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: "parallel".to_string(),
        }
    }
}

/// A map with a single viewport and any number of layers.
///
/// Maps are shared through `Rc`; layers keep a weak back-reference.
pub struct Map {
    config: MapConfig,
    node: RefCell<MapNode>,
    camera: RefCell<Camera>,
    projection: RefCell<MapProjection>,
    layers: RefCell<Vec<Rc<TileLayer>>>,
}

impl Map {
    /// Creates a map from its configuration.
    pub fn new(config: MapConfig) -> Rc<Self> {
        let mut projection = MapProjection::from_config(&config);
        let node = MapNode {
            id: config.node.clone(),
            width: projection.viewport.x,
            height: projection.viewport.y,
            classes: BTreeSet::new(),
        };

        let map = Self {
            config,
            node: RefCell::new(node),
            camera: RefCell::new(Camera::default()),
            projection: RefCell::new(projection.clone()),
            layers: RefCell::new(Vec::new()),
        };

        projection.zoom = map.clamp_zoom(projection.zoom, &projection);
        map.clamp_pan(&mut projection);
        *map.projection.borrow_mut() = projection;

        log::info!(
            "Created map on #{} (zoom {:.2}, {} coordinates)",
            map.config.node,
            map.zoom(),
            if map.config.is_pixel_mode() {
                "pixel"
            } else {
                "geographic"
            }
        );
        Rc::new(map)
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn node(&self) -> Ref<'_, MapNode> {
        self.node.borrow()
    }

    pub fn camera(&self) -> Ref<'_, Camera> {
        self.camera.borrow()
    }

    pub fn camera_mut(&self) -> RefMut<'_, Camera> {
        self.camera.borrow_mut()
    }

    /// Snapshot of the current projection.
    pub fn projection(&self) -> MapProjection {
        self.projection.borrow().clone()
    }

    pub fn zoom(&self) -> f64 {
        self.projection.borrow().zoom
    }

    /// Geographic coordinate at the center of the viewport.
    pub fn center(&self) -> Coord<f64> {
        let projection = self.projection.borrow();
        let mid = projection.viewport / 2.0;
        projection.display_to_gcs(Pos2::new(mid.x, mid.y))
    }

    pub fn gcs_to_display(&self, coord: Coord<f64>) -> Pos2 {
        self.projection.borrow().gcs_to_display(coord)
    }

    pub fn display_to_gcs(&self, pos: Pos2) -> Coord<f64> {
        self.projection.borrow().display_to_gcs(pos)
    }

    /// Adds or removes a class on the root node.
    ///
    /// In the browser the class is also applied to the DOM element whose id
    /// matches the configured node.
    pub fn toggle_class(&self, name: &str, on: bool) {
        self.node.borrow_mut().toggle_class(name, on);

        #[cfg(target_arch = "wasm32")]
        if let Some(element) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id(&self.config.node))
        {
            if let Err(e) = element.class_list().toggle_with_force(name, on) {
                log::warn!("Failed to toggle class {}: {:?}", name, e);
            }
        }
    }

    /// Resizes the viewport. Returns true if the size changed.
    pub fn set_viewport_size(&self, size: Vec2) -> bool {
        {
            let mut projection = self.projection.borrow_mut();
            if projection.viewport == size {
                return false;
            }
            projection.viewport = size;
            let mut clamped = projection.clone();
            clamped.zoom = self.clamp_zoom(clamped.zoom, &clamped);
            self.clamp_pan(&mut clamped);
            *projection = clamped;
        }
        {
            let mut node = self.node.borrow_mut();
            node.width = size.x;
            node.height = size.y;
        }

        log::debug!("Map viewport resized to {}x{}", size.x, size.y);
        self.trigger(EventArgs::new(GeoEvent::Resize));
        true
    }

    /// Moves the view by `delta` display pixels and notifies every layer.
    pub fn pan(&self, delta: Vec2) {
        {
            let mut projection = self.projection.borrow_mut();
            let mut moved = projection.clone();
            moved.pan_offset += delta;
            self.clamp_pan(&mut moved);
            *projection = moved;
        }
        self.trigger(EventArgs::pan(delta));
    }

    /// Sets the zoom level, keeping the viewport center fixed.
    pub fn set_zoom(&self, zoom: f64) {
        let projection = self.projection();
        let mid = projection.viewport / 2.0;
        self.zoom_to(zoom, Pos2::new(mid.x, mid.y));
    }

    /// Multiplies the scale by `factor`, keeping the point under `anchor` fixed.
    pub fn zoom_about(&self, factor: f64, anchor: Pos2) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let zoom = self.zoom() + factor.log2();
        self.zoom_to(zoom, anchor);
    }

    fn zoom_to(&self, zoom: f64, anchor: Pos2) {
        {
            let mut projection = self.projection.borrow_mut();
            let mut zoomed = projection.clone();
            let anchored = zoomed.display_to_world(anchor);
            zoomed.zoom = self.clamp_zoom(zoom, &zoomed);
            if zoomed.zoom == projection.zoom {
                return;
            }
            let drift = anchor - zoomed.world_to_display(anchored);
            zoomed.pan_offset += drift;
            self.clamp_pan(&mut zoomed);
            *projection = zoomed;
        }
        self.trigger(EventArgs::new(GeoEvent::Zoom));
        self.trigger(EventArgs::pan(Vec2::ZERO));
    }

    /// Returns to the configured zoom with no pan offset.
    pub fn reset_view(&self) {
        {
            let mut projection = self.projection.borrow_mut();
            let mut reset = projection.clone();
            reset.pan_offset = Vec2::ZERO;
            reset.zoom = self.clamp_zoom(self.config.zoom, &reset);
            self.clamp_pan(&mut reset);
            *projection = reset;
        }
        self.trigger(EventArgs::new(GeoEvent::Zoom));
        self.trigger(EventArgs::pan(Vec2::ZERO));
    }

    /// Creates a layer of the given kind and attaches it to the map.
    pub fn create_layer(
        self: &Rc<Self>,
        kind: &str,
        config: LayerConfig,
    ) -> Result<Rc<TileLayer>, SceneError> {
        match kind {
            "osm" | "tile" => {}
            other => return Err(SceneError::UnsupportedLayer(other.to_string())),
        }

        let id = LayerId(self.layers.borrow().len() as u64);
        let layer = Rc::new(TileLayer::new(id, kind, config, Rc::downgrade(self)));
        self.layers.borrow_mut().push(Rc::clone(&layer));

        log::info!(
            "Created {} layer {:?} (renderer: {})",
            kind,
            id,
            layer.renderer().unwrap_or("html")
        );
        Ok(layer)
    }

    pub fn layers(&self) -> Vec<Rc<TileLayer>> {
        self.layers.borrow().clone()
    }

    fn trigger(&self, args: EventArgs) {
        for layer in self.layers() {
            layer.geo_trigger(&args);
        }
    }

    /// Applies min/max, clamp-zoom and discrete-zoom rules.
    fn clamp_zoom(&self, zoom: f64, projection: &MapProjection) -> f64 {
        let max = self.config.max_zoom();
        let mut min = self.config.min_zoom();

        if self.config.clamps_zoom() {
            if let Some((lo, hi)) = projection.world_bounds() {
                let extent = hi - lo;
                let fit_x = projection.viewport.x as f64 / extent.x;
                let fit_y = projection.viewport.y as f64 / extent.y;
                // The world must fill the viewport along at least one axis
                let fill = fit_x.min(fit_y).log2();
                if fill.is_finite() {
                    min = min.max(fill);
                }
            }
        }

        let mut zoom = if zoom.is_nan() { min } else { zoom };
        if max >= min {
            zoom = zoom.clamp(min, max);
        } else if !max.is_nan() {
            zoom = max;
        }
        if self.config.is_discrete_zoom() {
            zoom = zoom.round();
        }
        zoom
    }

    /// Keeps the world covering the viewport on clamped axes.
    fn clamp_pan(&self, projection: &mut MapProjection) {
        let Some((lo, hi)) = projection.world_bounds() else {
            return;
        };
        let min = projection.world_to_display(lo);
        let max = projection.world_to_display(hi);

        if self.config.clamps_x() {
            projection.pan_offset.x += clamp_axis(min.x, max.x, projection.viewport.x);
        }
        if self.config.clamps_y() {
            projection.pan_offset.y += clamp_axis(min.y, max.y, projection.viewport.y);
        }
    }
}

/// Correction that keeps `[min, max]` covering `[0, view]` when it is larger
/// than the view, or inside it when smaller.
fn clamp_axis(min: f32, max: f32, view: f32) -> f32 {
    if !(min.is_finite() && max.is_finite()) {
        return 0.0;
    }
    if max - min >= view {
        if min > 0.0 {
            -min
        } else if max < view {
            view - max
        } else {
            0.0
        }
    } else if min < 0.0 {
        -min
    } else if max > view {
        view - max
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::config::PixelBounds;
    use std::cell::Cell;

    fn pixel_config() -> MapConfig {
        MapConfig {
            center: Coord { x: 1024.0, y: 512.0 },
            zoom: 3.0,
            max: Some(3.0),
            max_bounds: Some(PixelBounds {
                left: 0.0,
                top: 0.0,
                right: 2048.0,
                bottom: 1024.0,
            }),
            units_per_pixel: Some(8.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_zoom_clamped_to_bounds() {
        let map = Map::new(MapConfig {
            min: Some(2.0),
            max: Some(5.0),
            clamp_zoom: Some(false),
            ..Default::default()
        });
        map.set_zoom(9.0);
        assert_eq!(map.zoom(), 5.0);
        map.set_zoom(0.5);
        assert_eq!(map.zoom(), 2.0);
    }

    #[test]
    fn test_discrete_zoom_rounds() {
        let map = Map::new(MapConfig {
            discrete_zoom: Some(true),
            ..Default::default()
        });
        map.set_zoom(4.4);
        assert_eq!(map.zoom(), 4.0);
    }

    #[test]
    fn test_clamp_zoom_fills_viewport() {
        let map = Map::new(MapConfig::default());
        map.set_zoom(0.0);
        // 800x600 viewport over a 256px world: 600 / 256 is the smaller fit
        assert!((map.zoom() - (600.0f64 / 256.0).log2()).abs() < 1e-9);
    }

    #[test]
    fn test_pan_moves_display_positions() {
        let map = Map::new(MapConfig {
            clamp_bounds_y: Some(false),
            ..Default::default()
        });
        let coord = Coord { x: -90.0, y: 40.0 };
        let before = map.gcs_to_display(coord);
        map.pan(Vec2::new(10.0, -5.0));
        let after = map.gcs_to_display(coord);
        assert!((after.x - before.x - 10.0).abs() < 1e-3);
        assert!((after.y - before.y + 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_vertical_pan_clamped_to_image() {
        let map = Map::new(pixel_config());
        map.pan(Vec2::new(0.0, 10_000.0));
        let top = map.gcs_to_display(Coord { x: 0.0, y: 0.0 });
        assert!(top.y.abs() < 1e-3);
    }

    #[test]
    fn test_pan_notifies_layers() {
        let map = Map::new(MapConfig::default());
        let layer = map.create_layer("osm", LayerConfig::default()).unwrap();
        let seen = Rc::new(Cell::new(0));
        let counter = Rc::clone(&seen);
        let _sub = layer.geo_on(GeoEvent::Pan, move |_| counter.set(counter.get() + 1));

        map.pan(Vec2::new(1.0, 0.0));
        map.set_zoom(5.0);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_unknown_layer_kind() {
        let map = Map::new(MapConfig::default());
        let err = map.create_layer("feature", LayerConfig::default()).unwrap_err();
        assert_eq!(err, SceneError::UnsupportedLayer("feature".to_string()));
        assert!(map.layers().is_empty());
    }

    #[test]
    fn test_toggle_class() {
        let map = Map::new(MapConfig::default());
        map.toggle_class(DEBUG_LABEL_CLASS, true);
        map.toggle_class(DEBUG_BORDER_CLASS, false);
        assert!(map.node().has_class(DEBUG_LABEL_CLASS));
        assert!(!map.node().has_class(DEBUG_BORDER_CLASS));
        map.toggle_class(DEBUG_LABEL_CLASS, false);
        assert_eq!(map.node().classes().count(), 0);
    }

    #[test]
    fn test_resize_updates_node() {
        let map = Map::new(MapConfig::default());
        assert!(map.set_viewport_size(Vec2::new(1024.0, 768.0)));
        assert!(!map.set_viewport_size(Vec2::new(1024.0, 768.0)));
        assert_eq!(map.node().width(), 1024.0);
        assert_eq!(map.node().height(), 768.0);
    }
}
