//! Renderable features owned by widgets.

use super::error::SceneError;
use super::node::SceneNode;
use eframe::egui::Color32;
use geo_types::Coord;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_FEATURE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureId(u64);

/// Kinds of feature the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Point,
    Line,
    Polygon,
}

impl FeatureKind {
    /// Resolves a feature kind from its registered name.
    pub fn from_name(name: &str) -> Result<Self, SceneError> {
        match name {
            "point" => Ok(FeatureKind::Point),
            "line" => Ok(FeatureKind::Line),
            "polygon" => Ok(FeatureKind::Polygon),
            other => Err(SceneError::UnsupportedFeature(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Point => "point",
            FeatureKind::Line => "line",
            FeatureKind::Polygon => "polygon",
        }
    }
}

/// Drawing style for a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStyle {
    pub color: Color32,
    /// Stroke width in pixels
    pub width: f32,
    /// Point radius in pixels
    pub radius: f32,
}

impl Default for FeatureStyle {
    fn default() -> Self {
        Self {
            color: Color32::from_rgb(230, 120, 40),
            width: 2.0,
            radius: 4.0,
        }
    }
}

/// Construction arguments for a feature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureArgs {
    /// Geographic coordinates of the feature's vertices
    pub coordinates: Vec<Coord<f64>>,
    pub style: FeatureStyle,
}

impl FeatureArgs {
    pub fn new(coordinates: Vec<Coord<f64>>) -> Self {
        Self {
            coordinates,
            ..Default::default()
        }
    }
}

/// A drawable child of a widget.
#[derive(Debug)]
pub struct Feature {
    id: FeatureId,
    kind: FeatureKind,
    renderer: Option<String>,
    args: FeatureArgs,
    node: RefCell<SceneNode<Rc<Feature>>>,
    active: Cell<bool>,
}

impl Feature {
    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Renderer the feature was built for (`None` for the HTML renderer).
    pub fn renderer(&self) -> Option<&str> {
        self.renderer.as_deref()
    }

    pub fn args(&self) -> &FeatureArgs {
        &self.args
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Tears down the feature and its children. Safe to call more than once.
    pub fn exit(&self) {
        if !self.active.replace(false) {
            return;
        }
        let children = self.node.borrow_mut().take_children();
        for child in children {
            child.exit();
        }
        self.node.borrow_mut().reset();
        log::debug!("Feature {:?} ({}) exited", self.id, self.kind.name());
    }
}

/// Builds a feature of the named kind for the given renderer.
pub fn create_feature(
    name: &str,
    renderer: Option<&str>,
    args: FeatureArgs,
) -> Result<Rc<Feature>, SceneError> {
    let kind = FeatureKind::from_name(name)?;
    let mut node = SceneNode::new();
    node.modified();

    Ok(Rc::new(Feature {
        id: FeatureId(NEXT_FEATURE_ID.fetch_add(1, Ordering::Relaxed)),
        kind,
        renderer: renderer.map(str::to_string),
        args,
        node: RefCell::new(node),
        active: Cell::new(true),
    }))
}
