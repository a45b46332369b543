//! Response writer.
//!
//! Turns a serialization outcome into an HTTP response, deciding headers
//! and body in one place. Headers already present on the response (set by
//! earlier middleware) are left alone rather than overwritten.

use axum::body::Body;
use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use super::coordinator::SerializedResponse;

pub mod headers {
    use axum::http::HeaderName;

    pub const X_CACHE_SOURCE: HeaderName = HeaderName::from_static("x-cache-source");
    pub const X_CACHE_FORMAT: HeaderName = HeaderName::from_static("x-cache-format");
    pub const X_SERIALIZATION_FALLBACK: HeaderName =
        HeaderName::from_static("x-serialization-fallback");
    pub const X_COMPRESSION_STATUS: HeaderName = HeaderName::from_static("x-compression-status");

    pub const CACHE_SOURCE_MEMORY: &str = "memory";
    pub const COMPRESSION_DISABLED: &str = "disabled";
}

/// Where the response body came from, for the `X-Cache-Source` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

/// Build the response for a serialization outcome.
pub fn write_response(serialized: SerializedResponse, outcome: CacheOutcome) -> Response {
    let status = if serialized.last_resort {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    let mut response = Response::builder()
        .status(status)
        .body(Body::from(serialized.bytes))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response());

    let map = response.headers_mut();
    insert_if_absent(map, CONTENT_TYPE, serialized.content_type);
    if serialized.compressed {
        insert_if_absent(map, CONTENT_ENCODING, "gzip");
    }
    insert_if_absent(map, headers::X_CACHE_FORMAT, serialized.format.suffix());
    if outcome == CacheOutcome::Hit {
        insert_if_absent(map, headers::X_CACHE_SOURCE, headers::CACHE_SOURCE_MEMORY);
    }
    if let Some(reason) = serialized.fallback {
        insert_if_absent(map, headers::X_SERIALIZATION_FALLBACK, reason.as_str());
    }
    if serialized.compression_disabled {
        insert_if_absent(
            map,
            headers::X_COMPRESSION_STATUS,
            headers::COMPRESSION_DISABLED,
        );
    }
    response
}

/// Insert a header only when it has not been committed already; headers
/// set by earlier middleware win.
fn insert_if_absent(map: &mut HeaderMap, name: HeaderName, value: &str) {
    if map.contains_key(&name) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(value) {
        map.insert(name, value);
    }
}
