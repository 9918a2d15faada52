//! Positioned overlay widgets.
//!
//! A widget owns an overlay element that is kept aligned with a reference
//! position, either a geographic coordinate or a fixed viewport pixel. The
//! widget subscribes to its layer's pan events when it is created and
//! repositions the element on every pan until it is torn down.
//!
//! Lifecycle: `Active` until [`Widget::exit`] is called or the widget is
//! dropped, then `TornDown` for good. Deleting a feature that is not a child
//! and tearing down twice are both no-ops.

use crate::geo::TileLayer;
use crate::scene::{
    create_feature, Feature, FeatureArgs, GeoEvent, NodeId, SceneError, SceneNode, Subscription,
};
use eframe::egui::Pos2;
use geo_types::Coord;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Reference position a widget tracks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSource {
    /// Viewport pixel position, used unchanged
    Fixed(Pos2),
    /// Geographic coordinate, converted through the layer's map
    Geographic(Coord<f64>),
}

/// Construction arguments for a widget.
pub struct WidgetArgs {
    pub layer: Rc<TileLayer>,
    pub position: Option<PositionSource>,
    /// Text shown in the overlay element
    pub label: String,
}

impl WidgetArgs {
    pub fn new(layer: Rc<TileLayer>) -> Self {
        Self {
            layer,
            position: None,
            label: String::new(),
        }
    }

    pub fn with_position(mut self, position: PositionSource) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Anchor position in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetPosition {
    pub left: f32,
    pub top: f32,
}

impl WidgetPosition {
    pub const ORIGIN: Self = Self { left: 0.0, top: 0.0 };
}

impl From<Pos2> for WidgetPosition {
    fn from(pos: Pos2) -> Self {
        Self {
            left: pos.x,
            top: pos.y,
        }
    }
}

/// CSS positioning scheme of an overlay element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssPosition {
    Static,
    Relative,
}

/// Layout applied to an overlay element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementStyle {
    pub position: CssPosition,
    pub left: f32,
    pub top: f32,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            position: CssPosition::Static,
            left: 0.0,
            top: 0.0,
        }
    }
}

/// The element a widget places over the map.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    label: String,
    style: ElementStyle,
}

impl OverlayElement {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn style(&self) -> ElementStyle {
        self.style
    }

    fn css(&mut self, style: ElementStyle) {
        self.style = style;
    }
}

/// Whether a widget is still attached to its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Active,
    TornDown,
}

struct WidgetInner {
    id: NodeId,
    layer: Rc<TileLayer>,
    position: Option<PositionSource>,
    node: SceneNode<Rc<Feature>>,
    element: Option<OverlayElement>,
    /// Pan listener, released exactly once by `exit`
    subscription: Option<Subscription>,
}

impl WidgetInner {
    fn position(&self) -> WidgetPosition {
        match self.position {
            Some(PositionSource::Fixed(pos)) => pos.into(),
            Some(PositionSource::Geographic(coord)) => match self.layer.map() {
                Some(map) => map.gcs_to_display(coord).into(),
                None => {
                    log::warn!("Widget {:?}: layer has no map, using origin", self.id);
                    WidgetPosition::ORIGIN
                }
            },
            None => WidgetPosition::ORIGIN,
        }
    }

    fn position_maybe(&mut self) {
        let position = self.position();
        let Some(element) = self.element.as_mut() else {
            log::debug!("Widget {:?}: no element to position", self.id);
            return;
        };
        element.css(ElementStyle {
            position: CssPosition::Relative,
            left: position.left,
            top: position.top,
        });
    }

    fn state(&self) -> WidgetState {
        if self.subscription.is_some() {
            WidgetState::Active
        } else {
            WidgetState::TornDown
        }
    }
}

/// A DOM-style overlay anchored to the map.
pub struct Widget {
    inner: Rc<RefCell<WidgetInner>>,
}

impl Widget {
    /// Creates a widget and starts listening to its layer's pan events.
    pub fn new(args: WidgetArgs) -> Self {
        let id = NodeId::next();
        let layer = args.layer;
        let mut node = SceneNode::new();
        node.modified();

        let inner = Rc::new(RefCell::new(WidgetInner {
            id,
            layer: Rc::clone(&layer),
            position: args.position,
            node,
            element: Some(OverlayElement {
                label: args.label,
                style: ElementStyle::default(),
            }),
            subscription: None,
        }));

        let weak: Weak<RefCell<WidgetInner>> = Rc::downgrade(&inner);
        let subscription = layer.geo_on(GeoEvent::Pan, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().position_maybe();
            }
        });
        inner.borrow_mut().subscription = Some(subscription);
        layer.add_child(id);

        log::debug!("Widget {:?} attached to layer {:?}", id, layer.id());
        Self { inner }
    }

    pub fn id(&self) -> NodeId {
        self.inner.borrow().id
    }

    pub fn state(&self) -> WidgetState {
        self.inner.borrow().state()
    }

    /// The layer that owns this widget.
    pub fn layer(&self) -> Rc<TileLayer> {
        Rc::clone(&self.inner.borrow().layer)
    }

    /// Builds a feature of the named kind with the widget's renderer and
    /// attaches it as a child.
    pub fn create_feature(&self, name: &str, args: FeatureArgs) -> Result<Rc<Feature>, SceneError> {
        let mut inner = self.inner.borrow_mut();
        if inner.state() == WidgetState::TornDown {
            return Err(SceneError::Detached);
        }

        let feature = create_feature(name, inner.layer.renderer(), args)?;
        inner.node.add_child(Rc::clone(&feature));
        inner.node.modified();
        log::debug!(
            "Widget {:?} created {} feature {:?} (renderer: {})",
            inner.id,
            name,
            feature.id(),
            feature.renderer().unwrap_or("html")
        );
        Ok(feature)
    }

    /// Detaches a child feature and tears it down.
    ///
    /// Features that are not children of this widget are left untouched.
    pub fn delete_feature(&self, feature: &Rc<Feature>) -> &Self {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let removed = inner.node.remove_child_where(|c| Rc::ptr_eq(c, feature));
            if removed.is_some() {
                inner.node.modified();
            }
            removed
        };

        match removed {
            Some(child) => child.exit(),
            None => log::debug!("Feature {:?} is not a child, ignoring delete", feature.id()),
        }
        self
    }

    /// Child features, in creation order.
    pub fn features(&self) -> Vec<Rc<Feature>> {
        self.inner.borrow().node.children().to_vec()
    }

    /// Anchor position in viewport pixels.
    pub fn position(&self) -> WidgetPosition {
        self.inner.borrow().position()
    }

    /// Recomputes the position and applies it to the overlay element.
    pub fn position_maybe(&self) {
        self.inner.borrow_mut().position_maybe();
    }

    /// True if the anchor lies within the map viewport, edges included.
    ///
    /// Only the anchor is tested, so a widget anchored near the right or
    /// bottom edge can still extend past the viewport.
    pub fn is_in_viewport(&self) -> bool {
        let inner = self.inner.borrow();
        let Some(map) = inner.layer.map() else {
            return false;
        };
        let position = inner.position();
        let node = map.node();

        position.left >= 0.0
            && position.top >= 0.0
            && position.left <= node.width()
            && position.top <= node.height()
    }

    /// Overlay element, or `None` once torn down.
    pub fn element(&self) -> Option<OverlayElement> {
        self.inner.borrow().element.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().node.is_dirty()
    }

    /// Clears the modified flag after a redraw.
    pub fn clear_dirty(&self) -> bool {
        self.inner.borrow_mut().node.clear_dirty()
    }

    /// Tears the widget down: children, pan listener, then the element.
    pub fn exit(&self) {
        let (layer, subscription, children, id) = {
            let mut inner = self.inner.borrow_mut();
            let Some(subscription) = inner.subscription.take() else {
                log::debug!("Widget {:?} already torn down", inner.id);
                return;
            };
            let children = inner.node.take_children();
            (Rc::clone(&inner.layer), subscription, children, inner.id)
        };

        for child in children {
            child.exit();
        }
        layer.geo_off(subscription);
        layer.remove_child(id);

        let mut inner = self.inner.borrow_mut();
        inner.element = None;
        inner.node.reset();
        inner.node.modified();
        log::debug!("Widget {:?} torn down", id);
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{LayerConfig, Map, MapConfig};
    use eframe::egui::Vec2;

    fn setup() -> (Rc<Map>, Rc<TileLayer>) {
        let map = Map::new(MapConfig {
            clamp_bounds_y: Some(false),
            ..Default::default()
        });
        let layer = map.create_layer("osm", LayerConfig::default()).unwrap();
        (map, layer)
    }

    fn fixed(layer: &Rc<TileLayer>, x: f32, y: f32) -> Widget {
        Widget::new(
            WidgetArgs::new(Rc::clone(layer)).with_position(PositionSource::Fixed(Pos2::new(x, y))),
        )
    }

    #[test]
    fn test_construction_subscribes_and_marks_modified() {
        let (_map, layer) = setup();
        let widget = Widget::new(WidgetArgs::new(Rc::clone(&layer)));

        assert_eq!(widget.state(), WidgetState::Active);
        assert!(widget.is_dirty());
        assert_eq!(layer.listener_count(GeoEvent::Pan), 1);
        assert_eq!(layer.children(), vec![widget.id()]);
        assert!(Rc::ptr_eq(&widget.layer(), &layer));
    }

    #[test]
    fn test_position_viewport_is_unchanged() {
        let (_map, layer) = setup();
        let widget = fixed(&layer, 12.5, 40.0);
        assert_eq!(
            widget.position(),
            WidgetPosition {
                left: 12.5,
                top: 40.0
            }
        );
    }

    #[test]
    fn test_position_gcs_uses_map_conversion() {
        let (map, layer) = setup();
        let coord = Coord { x: -90.0, y: 35.0 };
        let widget = Widget::new(
            WidgetArgs::new(Rc::clone(&layer)).with_position(PositionSource::Geographic(coord)),
        );
        let expected = map.gcs_to_display(coord);
        assert_eq!(widget.position(), WidgetPosition::from(expected));
    }

    #[test]
    fn test_position_without_source_is_origin() {
        let (_map, layer) = setup();
        let widget = Widget::new(WidgetArgs::new(Rc::clone(&layer)));
        assert_eq!(widget.position(), WidgetPosition::ORIGIN);
    }

    #[test]
    fn test_is_in_viewport_edges() {
        let (map, layer) = setup();
        let (w, h) = (map.node().width(), map.node().height());

        assert!(fixed(&layer, 0.0, 0.0).is_in_viewport());
        assert!(fixed(&layer, w, h).is_in_viewport());
        assert!(!fixed(&layer, -1.0, 0.0).is_in_viewport());
        assert!(!fixed(&layer, w + 1.0, 0.0).is_in_viewport());
    }

    #[test]
    fn test_pan_repositions_element() {
        let (map, layer) = setup();
        let widget = Widget::new(
            WidgetArgs::new(Rc::clone(&layer))
                .with_position(PositionSource::Geographic(Coord { x: -98.0, y: 39.5 })),
        );
        assert_eq!(widget.element().unwrap().style().position, CssPosition::Static);

        map.pan(Vec2::new(25.0, 10.0));

        let style = widget.element().unwrap().style();
        let position = widget.position();
        assert_eq!(style.position, CssPosition::Relative);
        assert_eq!(style.left, position.left);
        assert_eq!(style.top, position.top);
        assert!((position.left - 425.0).abs() < 1e-3);
        assert!((position.top - 310.0).abs() < 1e-3);
    }

    #[test]
    fn test_create_feature_adds_child() {
        let (_map, layer) = setup();
        let widget = Widget::new(WidgetArgs::new(Rc::clone(&layer)));
        widget.clear_dirty();

        let feature = widget.create_feature("point", FeatureArgs::default()).unwrap();
        assert_eq!(feature.renderer(), Some("vgl"));
        assert_eq!(widget.features().len(), 1);
        assert!(widget.is_dirty());
    }

    #[test]
    fn test_create_unknown_feature_fails() {
        let (_map, layer) = setup();
        let widget = Widget::new(WidgetArgs::new(Rc::clone(&layer)));
        let err = widget.create_feature("contour", FeatureArgs::default()).unwrap_err();
        assert_eq!(err, SceneError::UnsupportedFeature("contour".to_string()));
        assert!(widget.features().is_empty());
    }

    #[test]
    fn test_delete_feature_chains_and_ignores_strangers() {
        let (_map, layer) = setup();
        let widget = Widget::new(WidgetArgs::new(Rc::clone(&layer)));
        let a = widget.create_feature("point", FeatureArgs::default()).unwrap();
        let b = widget.create_feature("line", FeatureArgs::default()).unwrap();
        let stranger = create_feature("point", None, FeatureArgs::default()).unwrap();

        widget.delete_feature(&a).delete_feature(&stranger);

        assert!(!a.is_active());
        assert!(stranger.is_active());
        assert_eq!(widget.features().len(), 1);
        assert!(Rc::ptr_eq(&widget.features()[0], &b));
    }

    #[test]
    fn test_exit_releases_everything() {
        let (map, layer) = setup();
        let widget = fixed(&layer, 5.0, 5.0);
        let feature = widget.create_feature("polygon", FeatureArgs::default()).unwrap();

        widget.exit();

        assert_eq!(widget.state(), WidgetState::TornDown);
        assert_eq!(layer.listener_count(GeoEvent::Pan), 0);
        assert!(layer.children().is_empty());
        assert!(widget.element().is_none());
        assert!(widget.features().is_empty());
        assert!(!feature.is_active());

        // Second teardown, manual repositioning and later pans are harmless
        widget.exit();
        widget.position_maybe();
        map.pan(Vec2::new(3.0, 3.0));
        assert!(widget.element().is_none());
    }

    #[test]
    fn test_create_feature_after_exit_fails() {
        let (_map, layer) = setup();
        let widget = Widget::new(WidgetArgs::new(Rc::clone(&layer)));
        widget.exit();
        assert_eq!(
            widget.create_feature("point", FeatureArgs::default()).unwrap_err(),
            SceneError::Detached
        );
    }

    #[test]
    fn test_dropping_widget_releases_listener_and_slot() {
        let (map, layer) = setup();
        let kept = fixed(&layer, 2.0, 2.0);
        for _ in 0..100 {
            drop(Widget::new(WidgetArgs::new(Rc::clone(&layer))));
        }
        drop(fixed(&layer, 1.0, 1.0));

        assert_eq!(layer.listener_count(GeoEvent::Pan), 1);
        assert_eq!(layer.children(), vec![kept.id()]);
        map.pan(Vec2::new(1.0, 1.0));

        drop(kept);
        assert_eq!(layer.listener_count(GeoEvent::Pan), 0);
        assert!(layer.children().is_empty());
    }

    #[test]
    fn test_drop_after_exit_is_harmless() {
        let (_map, layer) = setup();
        let widget = fixed(&layer, 1.0, 1.0);
        widget.exit();
        drop(widget);
        assert_eq!(layer.listener_count(GeoEvent::Pan), 0);
    }
}
