//! Splits an inbound URI path into endpoint, sub-path and query parameters.
//!
//! The raw text is whatever follows `scheme://` in an activated link, for
//! example `/content/Game/Spells/Fireball?edit&line=3`. The endpoint is the
//! first segment and is left untouched; the sub-path and every query key and
//! value are percent-decoded. Parsing never fails: malformed input degrades to
//! an empty endpoint, which simply matches no handler.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// Decoded query parameters. Keys are lowercase; a repeated key keeps its last
/// value and a key without `=` maps to the empty string.
pub type QueryParams = HashMap<String, String>;

/// A path split into its routing parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPath {
    /// First path segment naming the endpoint, verbatim.
    pub endpoint: String,
    /// Percent-decoded remainder of the path, without its leading `/`.
    pub path: String,
    /// Decoded query parameters.
    pub query: QueryParams,
}

impl DispatchPath {
    /// Parses `raw` into endpoint, sub-path and query.
    ///
    /// One leading `/` is ignored. The endpoint ends at the next `/` or `?`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let rest = raw.strip_prefix('/').unwrap_or(raw);
        let (endpoint, remainder) = match rest.find(['/', '?']) {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        let remainder = remainder.strip_prefix('/').unwrap_or(remainder);
        let (path, query) = match remainder.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (remainder, QueryParams::new()),
        };

        Self {
            endpoint: endpoint.to_owned(),
            path: decode(path),
            query,
        }
    }
}

fn parse_query(query: &str) -> QueryParams {
    query
        .split('&')
        .filter(|component| !component.is_empty())
        .map(|component| {
            let (key, value) = component.split_once('=').unwrap_or((component, ""));
            (decode(key).to_lowercase(), decode(value))
        })
        .collect()
}

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}
