//! Cache key grammar.
//!
//! Snapshot keys follow `"<base_key>:<format>"` where the format suffix is
//! `"json"` or `"binary"`. The base key is a resource identifier plus a
//! canonicalized filter representation, so semantically identical requests
//! collide to the same key regardless of parameter order.

use serde::{Deserialize, Serialize};

/// The wire format a snapshot was materialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    Json,
    Binary,
}

impl WireFormat {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }

    fn from_suffix(raw: &str) -> Option<Self> {
        match raw {
            "json" => Some(Self::Json),
            "binary" => Some(Self::Binary),
            _ => None,
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Build a canonical base key from a resource identifier and filter pairs.
///
/// Pairs are sorted by key and joined as `key=value;` so parameter order
/// never produces distinct keys for the same logical request.
pub fn base_key(resource: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return resource.to_string();
    }
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let mut key = String::with_capacity(resource.len() + params.len() * 16);
    key.push_str(resource);
    key.push('?');
    for (name, value) in sorted {
        key.push_str(name);
        key.push('=');
        key.push_str(value);
        key.push(';');
    }
    key
}

/// Append the format suffix to a base key.
pub fn format_key(base: &str, format: WireFormat) -> String {
    format!("{base}:{}", format.suffix())
}

/// Split a cache key into its base key and format.
///
/// Splits on the last `:`; an absent or unrecognized suffix defaults to
/// JSON with the whole input as the base key.
pub fn parse_format_key(key: &str) -> (String, WireFormat) {
    if let Some((base, suffix)) = key.rsplit_once(':')
        && let Some(format) = WireFormat::from_suffix(suffix)
    {
        return (base.to_string(), format);
    }
    (key.to_string(), WireFormat::Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_key_appends_suffix() {
        assert_eq!(format_key("players:42", WireFormat::Json), "players:42:json");
        assert_eq!(
            format_key("players:42", WireFormat::Binary),
            "players:42:binary"
        );
    }

    #[test]
    fn parse_format_key_round_trips() {
        assert_eq!(
            parse_format_key("players:42:json"),
            ("players:42".to_string(), WireFormat::Json)
        );
        assert_eq!(
            parse_format_key("players:42:binary"),
            ("players:42".to_string(), WireFormat::Binary)
        );
    }

    #[test]
    fn parse_format_key_defaults_to_json_without_suffix() {
        assert_eq!(
            parse_format_key("players:42"),
            ("players:42".to_string(), WireFormat::Json)
        );
    }

    #[test]
    fn base_key_is_order_independent() {
        let a = base_key(
            "players:2026",
            &[("team", "LAL".to_string()), ("position", "PG".to_string())],
        );
        let b = base_key(
            "players:2026",
            &[("position", "PG".to_string()), ("team", "LAL".to_string())],
        );
        assert_eq!(a, b);
        assert_eq!(a, "players:2026?position=PG;team=LAL;");
    }

    #[test]
    fn base_key_without_params_is_bare_resource() {
        assert_eq!(base_key("players:2026", &[]), "players:2026");
    }
}
