use thiserror::Error;

/// Domain↔wire conversion failures. Both directions fail closed: absent or
/// empty required input is an error, never a zero value.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("attribute `{attribute}` value {value} overflows the wire integer width")]
    AttributeOverflow { attribute: String, value: i64 },
    #[error("field `{field}` holds an out-of-range timestamp: {value}")]
    InvalidTimestamp { field: &'static str, value: i64 },
    #[error("no record in the batch survived conversion ({failed} failed)")]
    AllRecordsFailed { failed: usize },
}

/// Serialization-pipeline failures, split by direction. To-wire failures
/// are recoverable through the fallback chain; from-wire and decompression
/// failures surface to the caller as request errors.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("marshal failed: {message}")]
    Marshal { message: String },
    #[error("binary format cannot express `{shape}` responses")]
    UnsupportedShape { shape: &'static str },
    #[error("domain to wire conversion failed: {0}")]
    ToWire(#[source] ConvertError),
    #[error("wire to domain conversion failed: {0}")]
    FromWire(#[source] ConvertError),
    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),
    #[error("decompression failed: {0}")]
    Decompression(#[source] std::io::Error),
}

impl WireError {
    pub fn marshal(message: impl Into<String>) -> Self {
        Self::Marshal {
            message: message.into(),
        }
    }
}
