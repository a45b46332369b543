//! Quality-weighted Accept-header negotiation.
//!
//! Candidates are ranked by their `q` parameter, stable with respect to
//! header order so the first-listed type wins ties. Quality parsing
//! recognizes only the values real clients send (`1`, `1.0`, `0`,
//! `0.0`–`0.9`); anything else falls back to the default quality of 1.0.
//! This is a deliberate approximation, not a floating-point parser.

use crate::cache::WireFormat;

use super::codec::{MEDIA_TYPE_BINARY, MEDIA_TYPE_JSON};

/// Alternate MIME string accepted for the binary format.
pub const MEDIA_TYPE_BINARY_ALT: &str = "application/x-protobuf";

const MEDIA_TYPE_ANY: &str = "*/*";
const DEFAULT_QUALITY: f32 = 1.0;

struct Candidate<'a> {
    media_type: &'a str,
    quality: f32,
}

/// Resolve the wire format for a raw Accept header. An absent or empty
/// header, and a header matching none of the supported types, both yield
/// the JSON default.
pub fn negotiate(accept: Option<&str>) -> WireFormat {
    let Some(header) = accept else {
        return WireFormat::Json;
    };
    let mut candidates = parse_accept(header);
    // Stable sort: equal qualities keep their original header order.
    candidates.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(std::cmp::Ordering::Equal));

    for candidate in candidates {
        match candidate.media_type {
            MEDIA_TYPE_BINARY | MEDIA_TYPE_BINARY_ALT => return WireFormat::Binary,
            MEDIA_TYPE_JSON | MEDIA_TYPE_ANY => return WireFormat::Json,
            _ => continue,
        }
    }
    WireFormat::Json
}

fn parse_accept(header: &str) -> Vec<Candidate<'_>> {
    header
        .split(',')
        .filter_map(|candidate| {
            let mut parts = candidate.split(';');
            let media_type = parts.next()?.trim();
            if media_type.is_empty() {
                return None;
            }
            let quality = parts
                .filter_map(|param| {
                    let (name, value) = param.split_once('=')?;
                    (name.trim() == "q").then(|| value.trim())
                })
                .next()
                .and_then(parse_quality)
                .unwrap_or(DEFAULT_QUALITY);
            Some(Candidate {
                media_type,
                quality,
            })
        })
        .collect()
}

/// Parse a `q` value from the recognized set. Unrecognized values are a
/// parse failure, which callers treat as the default quality.
fn parse_quality(raw: &str) -> Option<f32> {
    match raw {
        "1" | "1.0" => Some(1.0),
        "0" | "0.0" => Some(0.0),
        _ => {
            let mut chars = raw.chars();
            if chars.next() == Some('0')
                && chars.next() == Some('.')
                && let Some(tenths) = chars.next().and_then(|c| c.to_digit(10))
                && chars.next().is_none()
            {
                return Some(tenths as f32 / 10.0);
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_absent_header_defaults_to_json() {
        assert_eq!(negotiate(None), WireFormat::Json);
        assert_eq!(negotiate(Some("")), WireFormat::Json);
    }

    #[test]
    fn first_listed_type_wins_quality_ties() {
        assert_eq!(
            negotiate(Some("application/json, application/x-binary")),
            WireFormat::Json
        );
        assert_eq!(
            negotiate(Some("application/x-binary, application/json")),
            WireFormat::Binary
        );
    }

    #[test]
    fn higher_quality_wins_regardless_of_order() {
        assert_eq!(
            negotiate(Some("application/json;q=0.8, application/x-binary;q=0.9")),
            WireFormat::Binary
        );
        assert_eq!(
            negotiate(Some("application/json;q=0.9, application/x-binary;q=0.8")),
            WireFormat::Json
        );
    }

    #[test]
    fn wildcard_maps_to_json() {
        assert_eq!(negotiate(Some("*/*")), WireFormat::Json);
        assert_eq!(
            negotiate(Some("application/x-binary;q=0.5, */*")),
            WireFormat::Json
        );
    }

    #[test]
    fn alternate_binary_media_type_is_supported() {
        assert_eq!(
            negotiate(Some("application/x-protobuf")),
            WireFormat::Binary
        );
    }

    #[test]
    fn unsupported_types_fall_through_to_default() {
        assert_eq!(negotiate(Some("text/html, image/png")), WireFormat::Json);
    }

    #[test]
    fn malformed_quality_falls_back_to_default() {
        // "abc" is unparseable, so both candidates sit at q=1.0 and the
        // first listed wins.
        assert_eq!(
            negotiate(Some("application/x-binary;q=abc, application/json")),
            WireFormat::Binary
        );
        // Out-of-set precision is also a parse failure.
        assert_eq!(
            negotiate(Some("application/json;q=0.85, application/x-binary;q=0.9")),
            WireFormat::Json
        );
    }

    #[test]
    fn whitespace_and_extra_params_are_tolerated() {
        assert_eq!(
            negotiate(Some(" application/x-binary ; charset=utf-8 ; q=0.9 , application/json ; q=0.3 ")),
            WireFormat::Binary
        );
    }

    #[test]
    fn quality_parser_recognized_set() {
        assert_eq!(parse_quality("1"), Some(1.0));
        assert_eq!(parse_quality("1.0"), Some(1.0));
        assert_eq!(parse_quality("0.9"), Some(0.9));
        assert_eq!(parse_quality("0"), Some(0.0));
        assert_eq!(parse_quality("0.85"), None);
        assert_eq!(parse_quality("2.0"), None);
        assert_eq!(parse_quality(""), None);
    }
}
