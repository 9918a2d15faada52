//! Tile layers.
//!
//! A tile layer addresses a pyramid of fixed-size tiles by level and x/y
//! index, resolves tile URLs from a template, and emits the map's events to
//! the nodes attached to it.

use super::config::{centered_tile_offset, LayerConfig, TileSource, TILE_SIZE};
use super::map::Map;
use super::projection::MapProjection;
use crate::scene::{EventArgs, GeoEvent, NodeId, SceneNode, Subscription};
use eframe::egui::{Pos2, Rect};
use glam::DVec2;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Default highest tile level.
const DEFAULT_MAX_LEVEL: u32 = 18;

/// Deepest level any layer addresses, whatever its configuration says.
pub const MAX_TILE_LEVEL: u32 = 30;

/// Subdomains used for `{s}` when none are configured.
const DEFAULT_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

const DEFAULT_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// Upper bound on tiles returned for one level.
const MAX_VISIBLE_TILES: i64 = 4096;

/// Identifier of a layer within its map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Address of a tile in the pyramid.
///
/// `x` and `y` are display indices; on wrapping axes they may fall outside
/// `[0, 2^level)` and are wrapped when building URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    pub level: u32,
    pub x: i64,
    pub y: i64,
}

impl TileIndex {
    pub fn new(level: u32, x: i64, y: i64) -> Self {
        Self { level, x, y }
    }

    /// Number of tiles along each axis at this level.
    pub fn tiles_per_axis(&self) -> i64 {
        1i64 << self.level.min(62)
    }

    /// Indices wrapped into the pyramid.
    pub fn wrapped(&self) -> (i64, i64) {
        let n = self.tiles_per_axis();
        (self.x.rem_euclid(n), self.y.rem_euclid(n))
    }
}

/// A map layer rendering a tile pyramid.
#[derive(Debug)]
pub struct TileLayer {
    id: LayerId,
    kind: String,
    config: LayerConfig,
    map: Weak<Map>,
    node: RefCell<SceneNode<NodeId>>,
}

impl TileLayer {
    pub(super) fn new(id: LayerId, kind: &str, config: LayerConfig, map: Weak<Map>) -> Self {
        let mut node = SceneNode::new();
        node.modified();
        Self {
            id,
            kind: kind.to_string(),
            config,
            map,
            node: RefCell::new(node),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// The map this layer belongs to, if it is still alive.
    pub fn map(&self) -> Option<Rc<Map>> {
        self.map.upgrade()
    }

    /// Renderer name; `None` selects the HTML renderer.
    pub fn renderer(&self) -> Option<&str> {
        self.config.renderer.as_deref()
    }

    /// Opacity in `[0, 1]`; malformed values draw fully opaque.
    pub fn opacity(&self) -> f32 {
        let opacity = self.config.opacity;
        if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn wraps_x(&self) -> bool {
        self.config.wrap_x.unwrap_or(true)
    }

    pub fn wraps_y(&self) -> bool {
        self.config.wrap_y.unwrap_or(false)
    }

    pub fn keeps_lower(&self) -> bool {
        self.config.keep_lower.unwrap_or(true)
    }

    pub fn min_level(&self) -> u32 {
        level_or(self.config.min_level, 0)
    }

    pub fn max_level(&self) -> u32 {
        level_or(self.config.max_level, DEFAULT_MAX_LEVEL).max(self.min_level())
    }

    pub fn attribution(&self) -> &str {
        self.config
            .attribution
            .as_deref()
            .unwrap_or(DEFAULT_ATTRIBUTION)
    }

    pub fn subdomains(&self) -> Vec<String> {
        match &self.config.subdomains {
            Some(list) if !list.is_empty() => list.clone(),
            _ => DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Pixel offset of tile (0, 0) at a level.
    pub fn tile_offset(&self, level: u32) -> DVec2 {
        match self.config.tile_offset {
            Some(offset) => offset(level),
            None => centered_tile_offset(level),
        }
    }

    /// URL template with `{z}`, `{x}`, `{y}` and `{s}` placeholders.
    pub fn url_template(&self) -> String {
        match &self.config.source {
            TileSource::Template(url) => url.clone(),
            TileSource::BaseUrl(base) => format!("{}{{z}}/{{x}}/{{y}}.png", base),
        }
    }

    /// Resolves the URL of a tile.
    ///
    /// Subdomains rotate with `(x + y + z)` so neighbouring tiles spread
    /// across hosts.
    pub fn tile_url(&self, tile: &TileIndex) -> String {
        let (x, y) = tile.wrapped();
        let subdomains = self.subdomains();
        let pick = (x + y + tile.level as i64).rem_euclid(subdomains.len() as i64) as usize;

        self.url_template()
            .replace("{z}", &tile.level.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{s}", &subdomains[pick])
    }

    /// Tile level used for a zoom level.
    pub fn tile_level(&self, zoom: f64) -> u32 {
        let level = if zoom.is_finite() {
            zoom.round().clamp(0.0, MAX_TILE_LEVEL as f64) as u32
        } else {
            0
        };
        level.clamp(self.min_level(), self.max_level())
    }

    /// Levels to draw, lowest first.
    pub fn levels_to_draw(&self, zoom: f64) -> Vec<u32> {
        let level = self.tile_level(zoom);
        if self.keeps_lower() {
            (self.min_level()..=level).collect()
        } else {
            vec![level]
        }
    }

    /// Tiles of `level` that intersect the viewport.
    pub fn visible_tiles(&self, projection: &MapProjection, level: u32) -> Vec<TileIndex> {
        let (min, max) = projection.visible_world();
        let scale = 2f64.powi(level as i32);
        let offset = self.tile_offset(level);
        let lo = (min * scale + offset) / TILE_SIZE;
        let hi = (max * scale + offset) / TILE_SIZE;
        if !(lo.is_finite() && hi.is_finite()) {
            return Vec::new();
        }

        let n = TileIndex::new(level, 0, 0).tiles_per_axis();
        let axis = |lo: f64, hi: f64, wraps: bool| {
            let mut first = lo.floor() as i64;
            let mut last = hi.ceil() as i64 - 1;
            if !wraps {
                first = first.max(0);
                last = last.min(n - 1);
            }
            (first, last)
        };
        let (x0, x1) = axis(lo.x, hi.x, self.wraps_x());
        let (y0, y1) = axis(lo.y, hi.y, self.wraps_y());

        let count = (x1 - x0 + 1).max(0).saturating_mul((y1 - y0 + 1).max(0));
        if count > MAX_VISIBLE_TILES {
            log::debug!(
                "Skipping level {} of layer {:?}: {} tiles visible",
                level,
                self.id,
                count
            );
            return Vec::new();
        }

        let mut tiles = Vec::with_capacity(count as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                tiles.push(TileIndex::new(level, x, y));
            }
        }
        tiles
    }

    /// Tile of `level` under a display position.
    pub fn tile_at(&self, projection: &MapProjection, pos: Pos2, level: u32) -> TileIndex {
        let scale = 2f64.powi(level as i32);
        let p = (projection.display_to_world(pos) * scale + self.tile_offset(level)) / TILE_SIZE;
        if !p.is_finite() {
            return TileIndex::new(level, 0, 0);
        }
        TileIndex::new(level, p.x.floor() as i64, p.y.floor() as i64)
    }

    /// Display rectangle covered by a tile.
    pub fn tile_display_rect(&self, projection: &MapProjection, tile: &TileIndex) -> Rect {
        let scale = 2f64.powi(tile.level as i32);
        let offset = self.tile_offset(tile.level);
        let origin = DVec2::new(tile.x as f64, tile.y as f64) * TILE_SIZE - offset;
        let min = projection.world_to_display(origin / scale);
        let max = projection.world_to_display((origin + DVec2::splat(TILE_SIZE)) / scale);
        Rect::from_two_pos(min, max)
    }

    /// Registers a handler for one of the map's events.
    pub fn geo_on(&self, event: GeoEvent, handler: impl Fn(&EventArgs) + 'static) -> Subscription {
        let subscription = self.node.borrow_mut().on(event, handler);
        log::debug!("Layer {:?}: subscribed to {:?}", self.id, event);
        subscription
    }

    /// Releases a subscription. Returns false if it was not registered here.
    pub fn geo_off(&self, subscription: Subscription) -> bool {
        let event = subscription.event();
        let removed = self.node.borrow_mut().off(subscription);
        log::debug!(
            "Layer {:?}: unsubscribed from {:?} (removed: {})",
            self.id,
            event,
            removed
        );
        removed
    }

    /// Delivers an event to every handler registered for it.
    pub fn geo_trigger(&self, args: &EventArgs) {
        let handlers = self.node.borrow().events().handlers(args.event);
        for handler in handlers {
            handler(args);
        }
    }

    pub fn listener_count(&self, event: GeoEvent) -> usize {
        self.node.borrow().events().listener_count(event)
    }

    /// Attaches a child node.
    pub fn add_child(&self, child: NodeId) {
        let mut node = self.node.borrow_mut();
        node.add_child(child);
        node.modified();
    }

    /// Detaches a child node. Returns false if it was not attached.
    pub fn remove_child(&self, child: NodeId) -> bool {
        let mut node = self.node.borrow_mut();
        let removed = node.remove_child_where(|c| *c == child).is_some();
        if removed {
            node.modified();
        }
        removed
    }

    pub fn children(&self) -> Vec<NodeId> {
        self.node.borrow().children().to_vec()
    }

    /// Number of modifications since the layer was created.
    pub fn generation(&self) -> u64 {
        self.node.borrow().generation()
    }
}

fn level_or(value: Option<f64>, default: u32) -> u32 {
    match value {
        Some(v) if v.is_finite() => v.floor().clamp(0.0, MAX_TILE_LEVEL as f64) as u32,
        _ => default,
    }
}
