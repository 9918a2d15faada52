//! Startup configuration built from URL query parameters.
//!
//! Recognized keys:
//!  - `clampBoundsX`, `clampBoundsY`, `clampZoom`, `discrete`: map flags
//!  - `clampBoundsX`, `lower`, `wrapX`, `wrapY`: tile layer flags
//!  - `debug`: `true` for tile labels, `border` for tile borders, `all` for both
//!  - `w`, `h`: size of a tiled image; switches the map to pixel coordinates
//!  - `min`, `max`: zoom range
//!  - `opacity`: tile layer opacity
//!  - `projection`: camera projection
//!  - `renderer`: `vgl` (default), `d3`, or `null`/`html` for the HTML renderer
//!  - `subdomains`: comma-separated list, or one subdomain per character
//!  - `url`: tile URL template
//!  - `x`, `y`, `zoom`: initial view
//!
//! Flags are only set when their key is present, and only the exact value
//! `true` enables them.

use super::url_state::QueryParams;
use crate::geo::{
    zero_tile_offset, LayerConfig, Map, MapConfig, PixelBounds, TileLayer, TileSource,
    DEBUG_BORDER_CLASS, DEBUG_LABEL_CLASS, DEFAULT_BASE_URL, DEFAULT_RENDERER,
};
use crate::scene::SceneError;
use geo_types::Coord;
use std::rc::Rc;

/// Kind of layer created at startup.
const STARTUP_LAYER_KIND: &str = "osm";

/// Map coordinate system strings for image maps. Reversing the y axis between
/// input and map keeps the image origin at the top-left corner.
const PIXEL_INGCS: &str = "+proj=longlat +axis=esu";
const PIXEL_GCS: &str = "+proj=longlat +axis=enu";

/// Debug classes to toggle on the map's root node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugClasses {
    /// Show tile labels (`debug-label`)
    pub label: bool,
    /// Draw tile borders (`debug-border`)
    pub border: bool,
}

impl DebugClasses {
    pub fn from_query_value(value: Option<&str>) -> Self {
        Self {
            label: matches!(value, Some("true") | Some("all")),
            border: matches!(value, Some("border") | Some("all")),
        }
    }
}

/// Everything needed to build the map and its tile layer.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub map: MapConfig,
    pub layer: LayerConfig,
    /// Camera projection override
    pub projection: Option<String>,
    pub debug: DebugClasses,
}

/// The map and the tile layer created from a [`StartupConfig`].
pub struct MapSession {
    pub map: Rc<Map>,
    pub layer: Rc<TileLayer>,
}

impl StartupConfig {
    /// Builds map and layer configuration from query parameters.
    pub fn from_query(query: &QueryParams) -> Self {
        let mut map = MapConfig {
            zoom: query.get("zoom").map(parse_float).unwrap_or(3.0),
            ..Default::default()
        };

        let renderer = match query.non_empty("renderer").unwrap_or(DEFAULT_RENDERER) {
            "null" | "html" => None,
            other => Some(other.to_string()),
        };
        let mut layer = LayerConfig {
            renderer,
            opacity: query.non_empty("opacity").map(parse_float).unwrap_or(1.0) as f32,
            source: match query.non_empty("url") {
                Some(url) => TileSource::Template(url.to_string()),
                None => TileSource::BaseUrl(DEFAULT_BASE_URL.to_string()),
            },
            subdomains: query.non_empty("subdomains").map(split_subdomains),
            ..Default::default()
        };

        // Image tile servers with a known size use pixel coordinates, with
        // (0, 0) at the upper left and (w, h) at the lower right.
        let pixel_mode = match (query.non_empty("w"), query.non_empty("h")) {
            (Some(w), Some(h)) => {
                apply_pixel_mode(&mut map, &mut layer, parse_int(w), parse_int(h));
                true
            }
            _ => false,
        };

        if query.get("x").is_some() || query.get("y").is_some() {
            map.center = Coord {
                x: query.get("x").map(parse_float).unwrap_or(map.center.x),
                y: query.get("y").map(parse_float).unwrap_or(map.center.y),
            };
        }
        if let Some(min) = query.get("min") {
            map.min = Some(parse_float(min));
        }
        if let Some(max) = query.get("max") {
            let max = parse_float(max);
            map.max = Some(max);
            // A derived level of 0 or NaN is as good as unset
            let derived = layer.max_level.filter(|level| *level != 0.0 && !level.is_nan());
            if derived.is_none() {
                layer.max_level = Some(max);
            }
        }

        set_flag(query, "clampBoundsX", &mut map.clamp_bounds_x);
        set_flag(query, "clampBoundsY", &mut map.clamp_bounds_y);
        set_flag(query, "clampZoom", &mut map.clamp_zoom);
        set_flag(query, "discrete", &mut map.discrete_zoom);

        set_flag(query, "clampBoundsX", &mut layer.clamp_bounds_x);
        set_flag(query, "lower", &mut layer.keep_lower);
        if !pixel_mode {
            set_flag(query, "wrapX", &mut layer.wrap_x);
            set_flag(query, "wrapY", &mut layer.wrap_y);
        }

        Self {
            map,
            layer,
            projection: query.non_empty("projection").map(str::to_string),
            debug: DebugClasses::from_query_value(query.get("debug")),
        }
    }

    /// Creates the map, applies camera and debug settings, and adds the tile layer.
    pub fn instantiate(&self) -> Result<MapSession, SceneError> {
        let map = Map::new(self.map.clone());

        // The projection lives on the camera, not in the map configuration
        if let Some(projection) = &self.projection {
            map.camera_mut().projection = projection.clone();
        }

        map.toggle_class(DEBUG_LABEL_CLASS, self.debug.label);
        map.toggle_class(DEBUG_BORDER_CLASS, self.debug.border);

        let layer = map.create_layer(STARTUP_LAYER_KIND, self.layer.clone())?;
        Ok(MapSession { map, layer })
    }
}

fn apply_pixel_mode(map: &mut MapConfig, layer: &mut LayerConfig, w: f64, h: f64) {
    let largest = if w.is_nan() || h.is_nan() {
        f64::NAN
    } else {
        w.max(h)
    };
    let max = (largest / 256.0).log2().ceil();

    map.ingcs = Some(PIXEL_INGCS.to_string());
    map.gcs = Some(PIXEL_GCS.to_string());
    map.max_bounds = Some(PixelBounds {
        left: 0.0,
        top: 0.0,
        right: w,
        bottom: h,
    });
    map.center = Coord {
        x: w / 2.0,
        y: h / 2.0,
    };
    map.max = Some(max);
    map.clamp_bounds_y = Some(true);
    // Units per pixel at zoom 0, so each pixel is one unit at the max zoom
    map.units_per_pixel = Some(2f64.powf(max));

    layer.max_level = Some(max);
    layer.wrap_x = Some(false);
    layer.wrap_y = Some(false);
    layer.tile_offset = Some(zero_tile_offset);
    layer.attribution = Some(String::new());
}

fn set_flag(query: &QueryParams, key: &str, target: &mut Option<bool>) {
    if let Some(flag) = query.flag(key) {
        *target = Some(flag);
    }
}

/// Splits a subdomain list: on commas if there are any, else per character.
fn split_subdomains(value: &str) -> Vec<String> {
    if value.contains(',') {
        value.split(',').map(str::to_string).collect()
    } else {
        value.chars().map(String::from).collect()
    }
}

/// Parses the leading decimal number of a string, NaN if there is none.
///
/// Trailing text is ignored, so `4.5px` parses as 4.5.
pub fn parse_float(value: &str) -> f64 {
    let s = value.trim_start();
    let bytes = s.as_bytes();
    let digits_in = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_digits = digits_in(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_in(end + 1);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_digits = digits_in(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

/// Parses the leading decimal integer of a string, NaN if there is none.
pub fn parse_int(value: &str) -> f64 {
    let s = value.trim_start();
    let sign_len = usize::from(s.starts_with('+') || s.starts_with('-'));
    let digits = s[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return f64::NAN;
    }
    s[..sign_len + digits].parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::TileIndex;

    fn config(query: &str) -> StartupConfig {
        StartupConfig::from_query(&QueryParams::parse(query))
    }

    #[test]
    fn test_defaults() {
        let cfg = config("");
        assert_eq!(cfg.map, MapConfig::default());
        assert_eq!(cfg.map.zoom, 3.0);
        assert_eq!(cfg.layer.renderer.as_deref(), Some("vgl"));
        assert_eq!(cfg.layer.opacity, 1.0);
        assert_eq!(
            cfg.layer.source,
            TileSource::BaseUrl(DEFAULT_BASE_URL.to_string())
        );
        assert_eq!(cfg.layer.subdomains, None);
        assert_eq!(cfg.layer.wrap_x, None);
        assert_eq!(cfg.projection, None);
        assert_eq!(cfg.debug, DebugClasses::default());
    }

    #[test]
    fn test_boolean_keys_exact_true() {
        let cfg = config(
            "clampBoundsX=true&clampBoundsY=false&clampZoom=1&discrete=&lower=true&wrapX=TRUE&wrapY=true",
        );
        assert_eq!(cfg.map.clamp_bounds_x, Some(true));
        assert_eq!(cfg.map.clamp_bounds_y, Some(false));
        assert_eq!(cfg.map.clamp_zoom, Some(false));
        assert_eq!(cfg.map.discrete_zoom, Some(false));
        assert_eq!(cfg.layer.clamp_bounds_x, Some(true));
        assert_eq!(cfg.layer.keep_lower, Some(true));
        assert_eq!(cfg.layer.wrap_x, Some(false));
        assert_eq!(cfg.layer.wrap_y, Some(true));
    }

    #[test]
    fn test_absent_booleans_stay_unset() {
        let cfg = config("zoom=2");
        assert_eq!(cfg.map.clamp_bounds_x, None);
        assert_eq!(cfg.map.discrete_zoom, None);
        assert_eq!(cfg.layer.keep_lower, None);
    }

    #[test]
    fn test_pixel_mode_derivation() {
        let cfg = config("w=400&h=200");
        assert_eq!(cfg.map.max, Some(1.0));
        assert_eq!(cfg.map.center, Coord { x: 200.0, y: 100.0 });
        assert_eq!(cfg.map.units_per_pixel, Some(2.0));
        assert_eq!(cfg.map.clamp_bounds_y, Some(true));
        assert_eq!(cfg.map.ingcs.as_deref(), Some(PIXEL_INGCS));
        assert_eq!(cfg.map.gcs.as_deref(), Some(PIXEL_GCS));
        assert_eq!(
            cfg.map.max_bounds,
            Some(PixelBounds {
                left: 0.0,
                top: 0.0,
                right: 400.0,
                bottom: 200.0
            })
        );
        assert_eq!(cfg.layer.max_level, Some(1.0));
        assert_eq!(cfg.layer.wrap_x, Some(false));
        assert_eq!(cfg.layer.wrap_y, Some(false));
        assert_eq!(cfg.layer.attribution.as_deref(), Some(""));
        let offset = cfg.layer.tile_offset.map(|f| f(3));
        assert_eq!(offset, Some(glam::DVec2::ZERO));
    }

    #[test]
    fn test_pixel_mode_large_image() {
        let cfg = config("w=5000&h=3000");
        // ceil(log2(5000 / 256)) = ceil(4.29)
        assert_eq!(cfg.map.max, Some(5.0));
        assert_eq!(cfg.map.units_per_pixel, Some(32.0));
    }

    #[test]
    fn test_pixel_mode_needs_both_dimensions() {
        let cfg = config("w=400");
        assert_eq!(cfg.map.units_per_pixel, None);
        let cfg = config("w=400&h=");
        assert_eq!(cfg.map.units_per_pixel, None);
    }

    #[test]
    fn test_explicit_values_override_pixel_mode() {
        let cfg = config("w=400&h=200&x=10&y=20&min=-1&max=4&wrapX=true&wrapY=true");
        assert_eq!(cfg.map.center, Coord { x: 10.0, y: 20.0 });
        assert_eq!(cfg.map.min, Some(-1.0));
        assert_eq!(cfg.map.max, Some(4.0));
        // Derived layer values win over the independent settings
        assert_eq!(cfg.layer.max_level, Some(1.0));
        assert_eq!(cfg.layer.wrap_x, Some(false));
        assert_eq!(cfg.layer.wrap_y, Some(false));
    }

    #[test]
    fn test_max_replaces_zero_or_nan_derived_level() {
        // A 256px image derives level 0
        let cfg = config("w=256&h=256&max=5");
        assert_eq!(cfg.map.max, Some(5.0));
        assert_eq!(cfg.layer.max_level, Some(5.0));

        let cfg = config("w=abc&h=256&max=5");
        assert_eq!(cfg.layer.max_level, Some(5.0));

        let cfg = config("w=256&h=256");
        assert_eq!(cfg.layer.max_level, Some(0.0));
    }

    #[test]
    fn test_huge_zoom_and_max_stay_drawable() {
        let session = config("zoom=1e10&max=1e10").instantiate().unwrap();
        // Levels stop at the pyramid depth of 30
        assert_eq!(session.layer.tile_level(session.map.zoom()), 30);
        assert_eq!(session.layer.levels_to_draw(session.map.zoom()).len(), 31);
    }

    #[test]
    fn test_max_sets_layer_level() {
        let cfg = config("max=12");
        assert_eq!(cfg.map.max, Some(12.0));
        assert_eq!(cfg.layer.max_level, Some(12.0));
    }

    #[test]
    fn test_renderer_mapping() {
        assert_eq!(config("renderer=html").layer.renderer, None);
        assert_eq!(config("renderer=null").layer.renderer, None);
        assert_eq!(config("renderer=d3").layer.renderer.as_deref(), Some("d3"));
        assert_eq!(config("renderer=").layer.renderer.as_deref(), Some("vgl"));
    }

    #[test]
    fn test_subdomains() {
        let expected: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(config("subdomains=abc").layer.subdomains, Some(expected.clone()));
        assert_eq!(config("subdomains=a,b,c").layer.subdomains, Some(expected));
        assert_eq!(
            config("subdomains=tile1,tile2").layer.subdomains,
            Some(vec!["tile1".to_string(), "tile2".to_string()])
        );
    }

    #[test]
    fn test_url_template() {
        let cfg = config("url=http%3A%2F%2F%7Bs%7D.tile.openstreetmap.org%2F%7Bz%7D%2F%7Bx%7D%2F%7By%7D.png");
        assert_eq!(
            cfg.layer.source,
            TileSource::Template("http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string())
        );
    }

    #[test]
    fn test_malformed_numbers_are_nan() {
        let cfg = config("zoom=abc&x=&opacity=half");
        assert!(cfg.map.zoom.is_nan());
        assert!(cfg.map.center.x.is_nan());
        assert_eq!(cfg.map.center.y, 39.5);
        assert!(cfg.layer.opacity.is_nan());
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float("4.5"), 4.5);
        assert_eq!(parse_float("  -2.5e2px"), -250.0);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("7."), 7.0);
        assert_eq!(parse_float("3e"), 3.0);
        assert_eq!(parse_float("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_float("").is_nan());
        assert!(parse_float(".").is_nan());
        assert!(parse_float("nan").is_nan());
    }

    #[test]
    fn test_parse_int_prefix() {
        assert_eq!(parse_int("400"), 400.0);
        assert_eq!(parse_int("400.9"), 400.0);
        assert_eq!(parse_int(" -12px"), -12.0);
        assert!(parse_int("px").is_nan());
    }

    #[test]
    fn test_debug_classes() {
        assert_eq!(
            DebugClasses::from_query_value(Some("true")),
            DebugClasses {
                label: true,
                border: false
            }
        );
        assert_eq!(
            DebugClasses::from_query_value(Some("border")),
            DebugClasses {
                label: false,
                border: true
            }
        );
        assert_eq!(
            DebugClasses::from_query_value(Some("all")),
            DebugClasses {
                label: true,
                border: true
            }
        );
        assert_eq!(DebugClasses::from_query_value(None), DebugClasses::default());
    }

    #[test]
    fn test_instantiate_session() {
        let cfg = config("debug=all&projection=projection&renderer=html");
        let session = cfg.instantiate().unwrap();

        assert_eq!(session.map.camera().projection, "projection");
        assert!(session.map.node().has_class(DEBUG_LABEL_CLASS));
        assert!(session.map.node().has_class(DEBUG_BORDER_CLASS));
        assert_eq!(session.map.layers().len(), 1);
        assert_eq!(session.layer.kind(), "osm");
        assert_eq!(session.layer.renderer(), None);
    }

    #[test]
    fn test_instantiate_pixel_session_urls() {
        let cfg = config("w=400&h=200&url=/data/tiles/{z}/{x}/{y}.png&debug=border");
        let session = cfg.instantiate().unwrap();

        assert_eq!(session.map.camera().projection, "parallel");
        assert!(!session.map.node().has_class(DEBUG_LABEL_CLASS));
        assert!(session.map.node().has_class(DEBUG_BORDER_CLASS));
        assert_eq!(session.layer.max_level(), 1);
        assert_eq!(
            session.layer.tile_url(&TileIndex::new(1, 1, 0)),
            "/data/tiles/1/1/0.png"
        );
        assert_eq!(session.layer.attribution(), "");
    }
}
