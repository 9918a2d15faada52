//! URL query parameter parsing.
//!
//! The map is configured entirely from the page's query string, e.g.
//! `?renderer=html&debug=all&w=4096&h=2048&url=/data/tiles/{z}/{x}/{y}.png`.
//! Native builds accept the same string as the first command-line argument.

use percent_encoding::percent_decode_str;
use std::collections::HashMap;

/// Parsed URL parameters.
///
/// Values are percent-decoded; keys are used verbatim. When a key repeats,
/// the last occurrence wins.
/// A key without `=` is treated as not set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    /// Parses a raw query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let mut values = HashMap::new();
        let query = query.trim_start_matches('?');

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                values.remove(pair);
                continue;
            };
            let value = percent_decode_str(value).decode_utf8_lossy().into_owned();
            values.insert(key.to_string(), value);
        }

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The value of `key` if it is set and not empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// `Some(value == "true")` when the key is set.
    ///
    /// Only the exact string `true` is true; `1`, `yes` and `TRUE` are false.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v == "true")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse URL query parameters from the current browser URL.
#[cfg(target_arch = "wasm32")]
pub fn parse_from_url() -> QueryParams {
    let Some(window) = web_sys::window() else {
        return QueryParams::default();
    };

    match window.location().search() {
        Ok(search) => QueryParams::parse(&search),
        Err(e) => {
            log::warn!("Failed to read location.search: {:?}", e);
            QueryParams::default()
        }
    }
}

/// Parse query parameters from the first command-line argument.
#[cfg(not(target_arch = "wasm32"))]
pub fn parse_from_url() -> QueryParams {
    std::env::args()
        .nth(1)
        .map(|query| QueryParams::parse(&query))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let query = QueryParams::parse("?zoom=4&renderer=d3");
        assert_eq!(query.len(), 2);
        assert_eq!(query.get("zoom"), Some("4"));
        assert_eq!(query.get("renderer"), Some("d3"));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let query = QueryParams::parse("x=1&x=2&x=3");
        assert_eq!(query.get("x"), Some("3"));
    }

    #[test]
    fn test_key_without_value_is_unset() {
        let query = QueryParams::parse("debug&wrapX=true");
        assert_eq!(query.get("debug"), None);
        assert_eq!(query.flag("wrapX"), Some(true));

        // A bare key also clears an earlier value
        let query = QueryParams::parse("debug=all&debug");
        assert_eq!(query.get("debug"), None);
    }

    #[test]
    fn test_split_on_first_equals_and_decode() {
        let query = QueryParams::parse(
            "url=http%3A%2F%2F%7Bs%7D.tile.openstreetmap.org%2F%7Bz%7D%2F%7Bx%7D%2F%7By%7D.png&q=a=b",
        );
        assert_eq!(
            query.get("url"),
            Some("http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
        );
        assert_eq!(query.get("q"), Some("a=b"));
    }

    #[test]
    fn test_keys_are_not_decoded() {
        let query = QueryParams::parse("wrap%58=true&zoom=%34");
        assert_eq!(query.get("wrap%58"), Some("true"));
        assert_eq!(query.get("wrapX"), None);
        assert_eq!(query.get("zoom"), Some("4"));
    }

    #[test]
    fn test_flag_is_exact_match() {
        let query = QueryParams::parse("a=true&b=false&c=&d=1&e=TRUE");
        assert_eq!(query.flag("a"), Some(true));
        assert_eq!(query.flag("b"), Some(false));
        assert_eq!(query.flag("c"), Some(false));
        assert_eq!(query.flag("d"), Some(false));
        assert_eq!(query.flag("e"), Some(false));
        assert_eq!(query.flag("f"), None);
    }

    #[test]
    fn test_empty_query() {
        assert!(QueryParams::parse("").is_empty());
        assert!(QueryParams::parse("?").is_empty());
        assert_eq!(QueryParams::parse("c=").non_empty("c"), None);
    }
}
