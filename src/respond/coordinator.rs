//! Serialization fallback coordination.
//!
//! Per request, the chain is: preferred codec → on a to-wire failure, one
//! retry with the JSON codec, tagging the response with the reason → if
//! JSON also fails, the fixed last-resort error body. A compression
//! failure retries the same codec uncompressed instead of switching
//! codecs. From-wire and decompression failures never enter the chain;
//! they surface to the caller as request errors.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use metrics::counter;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, warn};

use crate::cache::{WireFormat, recover_poisoned};
use crate::wire::codec::{ErrorBody, MEDIA_TYPE_JSON, WireBody, codec_for};
use crate::wire::error::WireError;

use super::compress;

pub(crate) const METRIC_FALLBACK_TOTAL: &str = "statline_fallback_total";

/// Why a degrade step was taken. The wire string is what clients see in
/// the `X-Serialization-Fallback` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    MarshalFailed,
    ConversionFailed,
    CompressionFailed,
    DecompressionFailed,
    ClientIncompatible,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarshalFailed => "marshal_failed",
            Self::ConversionFailed => "conversion_failed",
            Self::CompressionFailed => "compression_failed",
            Self::DecompressionFailed => "decompression_failed",
            Self::ClientIncompatible => "client_incompatible",
        }
    }
}

impl From<&WireError> for FallbackReason {
    fn from(err: &WireError) -> Self {
        match err {
            // A shape the binary marshaller cannot express fails at
            // marshal time.
            WireError::Marshal { .. } | WireError::UnsupportedShape { .. } => Self::MarshalFailed,
            WireError::ToWire(_) | WireError::FromWire(_) => Self::ConversionFailed,
            WireError::Compression(_) => Self::CompressionFailed,
            WireError::Decompression(_) => Self::DecompressionFailed,
        }
    }
}

/// Best-effort failure bookkeeping shared across requests. Counter updates
/// recover from poisoned locks and never propagate a panic.
#[derive(Default)]
pub struct FallbackMetrics {
    counts: Mutex<HashMap<FallbackReason, u64>>,
    last_error_at: Mutex<Option<OffsetDateTime>>,
}

impl FallbackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, reason: FallbackReason, err: &WireError) {
        warn!(reason = reason.as_str(), error = %err, "serialization fallback recorded");
        counter!(METRIC_FALLBACK_TOTAL, "reason" => reason.as_str()).increment(1);
        let mut counts = recover_poisoned(self.counts.lock(), "fallback.record_counts");
        *counts.entry(reason).or_insert(0) += 1;
        drop(counts);
        let mut last = recover_poisoned(self.last_error_at.lock(), "fallback.record_last_error");
        *last = Some(OffsetDateTime::now_utc());
    }

    pub fn count(&self, reason: FallbackReason) -> u64 {
        recover_poisoned(self.counts.lock(), "fallback.count")
            .get(&reason)
            .copied()
            .unwrap_or(0)
    }

    pub fn last_error_at(&self) -> Option<OffsetDateTime> {
        *recover_poisoned(self.last_error_at.lock(), "fallback.last_error_at")
    }
}

/// The outcome of one serialization pass, headers and body decided
/// together so content type and body can never disagree.
pub struct SerializedResponse {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub format: WireFormat,
    pub compressed: bool,
    /// Set when the response was produced by a degrade step.
    pub fallback: Option<FallbackReason>,
    /// Set when compression failed and the payload went out raw.
    pub compression_disabled: bool,
    /// Set when even the JSON retry failed and the fixed error body was
    /// emitted; the writer maps this to a 500.
    pub last_resort: bool,
}

/// Serialize `body` under the negotiated format, degrading per the
/// fallback policy. Always returns a response; total failure yields the
/// fixed-shape error body.
pub fn serialize_with_fallback(
    format: WireFormat,
    body: &WireBody,
    metrics: &FallbackMetrics,
) -> SerializedResponse {
    match attempt(format, body, metrics) {
        Ok(response) => response,
        Err(err) => {
            let reason = FallbackReason::from(&err);
            metrics.record(reason, &err);
            if format == WireFormat::Json {
                return last_resort(reason);
            }
            match attempt(WireFormat::Json, body, metrics) {
                Ok(mut response) => {
                    response.fallback = Some(reason);
                    response
                }
                Err(json_err) => {
                    metrics.record(FallbackReason::from(&json_err), &json_err);
                    error!(error = %json_err, "json fallback also failed, emitting last resort body");
                    last_resort(reason)
                }
            }
        }
    }
}

fn attempt(
    format: WireFormat,
    body: &WireBody,
    metrics: &FallbackMetrics,
) -> Result<SerializedResponse, WireError> {
    let codec = codec_for(format);
    let raw = codec.serialize(body)?;
    if codec.should_compress() {
        match compress::gzip(&raw) {
            Ok(compressed) => {
                return Ok(SerializedResponse {
                    bytes: compressed,
                    content_type: codec.content_type(),
                    format,
                    compressed: true,
                    fallback: None,
                    compression_disabled: false,
                    last_resort: false,
                });
            }
            Err(err) => {
                // Same codec, uncompressed. Never a different codec.
                metrics.record(FallbackReason::CompressionFailed, &err);
                return Ok(SerializedResponse {
                    bytes: raw,
                    content_type: codec.content_type(),
                    format,
                    compressed: false,
                    fallback: None,
                    compression_disabled: true,
                    last_resort: false,
                });
            }
        }
    }
    Ok(SerializedResponse {
        bytes: raw,
        content_type: codec.content_type(),
        format,
        compressed: false,
        fallback: None,
        compression_disabled: false,
        last_resort: false,
    })
}

fn last_resort(reason: FallbackReason) -> SerializedResponse {
    let time = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("unknown"));
    let body = ErrorBody {
        error: "serialization_failed".to_string(),
        message: format!("response could not be serialized ({})", reason.as_str()),
        time,
    };
    // Three string fields always serialize; keep a literal floor anyway so
    // this path cannot panic.
    let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| {
        br#"{"error":"serialization_failed","message":"unserializable","time":"unknown"}"#.to_vec()
    });
    SerializedResponse {
        bytes: Bytes::from(bytes),
        content_type: MEDIA_TYPE_JSON,
        format: WireFormat::Json,
        compressed: false,
        fallback: Some(reason),
        compression_disabled: false,
        last_resort: true,
    }
}
