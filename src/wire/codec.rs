//! The codec pair.
//!
//! Exactly two serializers stand behind one contract. JSON accepts any
//! response body; the binary codec is schema-bound and fails with a typed
//! error for shapes outside its closed set, which is what arms the
//! fallback chain.

use std::sync::Arc;

use bytes::Bytes;
use prost::Message;
use serde::Serialize;

use crate::cache::WireFormat;
use crate::domain::players::DatasetSummary;
use crate::domain::ratings::RatingReport;

use super::convert::{report_from_wire, report_to_wire};
use super::error::WireError;
use super::messages::RatingReportMessage;

pub const MEDIA_TYPE_JSON: &str = "application/json";
pub const MEDIA_TYPE_BINARY: &str = "application/x-binary";

/// A response body as handed to a codec.
#[derive(Debug, Clone)]
pub enum WireBody {
    /// A freshly computed domain report.
    Report(Arc<RatingReport>),
    /// A cached, pre-converted binary snapshot.
    ReportWire(RatingReportMessage),
    /// The dataset listing. JSON only; the binary schema covers rating
    /// reports.
    Datasets(Vec<DatasetSummary>),
    /// The fixed-shape error body. JSON only.
    Error(ErrorBody),
}

/// Fixed error body shape; guaranteed to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub time: String,
}

/// Contract shared by the two wire serializers.
pub trait ResponseCodec: Send + Sync {
    fn serialize(&self, body: &WireBody) -> Result<Bytes, WireError>;
    fn content_type(&self) -> &'static str;
    fn should_compress(&self) -> bool;
}

pub struct JsonCodec;
pub struct BinaryCodec;

static JSON_CODEC: JsonCodec = JsonCodec;
static BINARY_CODEC: BinaryCodec = BinaryCodec;

/// Resolve the codec for a negotiated format.
pub fn codec_for(format: WireFormat) -> &'static dyn ResponseCodec {
    match format {
        WireFormat::Json => &JSON_CODEC,
        WireFormat::Binary => &BINARY_CODEC,
    }
}

fn json_bytes<T: Serialize>(value: &T) -> Result<Bytes, WireError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| WireError::marshal(err.to_string()))
}

impl ResponseCodec for JsonCodec {
    fn serialize(&self, body: &WireBody) -> Result<Bytes, WireError> {
        match body {
            WireBody::Report(report) => json_bytes(report.as_ref()),
            // A cached binary snapshot served as JSON goes back through the
            // wire-to-domain conversion first.
            WireBody::ReportWire(message) => {
                let report = report_from_wire(message).map_err(WireError::FromWire)?;
                json_bytes(&report)
            }
            WireBody::Datasets(summaries) => json_bytes(summaries),
            WireBody::Error(error) => json_bytes(error),
        }
    }

    fn content_type(&self) -> &'static str {
        MEDIA_TYPE_JSON
    }

    fn should_compress(&self) -> bool {
        false
    }
}

impl ResponseCodec for BinaryCodec {
    fn serialize(&self, body: &WireBody) -> Result<Bytes, WireError> {
        match body {
            WireBody::Report(report) => {
                let message = report_to_wire(report).map_err(WireError::ToWire)?;
                Ok(Bytes::from(message.encode_to_vec()))
            }
            WireBody::ReportWire(message) => Ok(Bytes::from(message.encode_to_vec())),
            WireBody::Datasets(_) => Err(WireError::UnsupportedShape {
                shape: "dataset listing",
            }),
            WireBody::Error(_) => Err(WireError::UnsupportedShape { shape: "error" }),
        }
    }

    fn content_type(&self) -> &'static str {
        MEDIA_TYPE_BINARY
    }

    fn should_compress(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use time::OffsetDateTime;

    use super::*;
    use crate::domain::ratings::PlayerRating;

    fn sample_report() -> Arc<RatingReport> {
        Arc::new(RatingReport {
            dataset: "players-2026".to_string(),
            generated_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            players: vec![PlayerRating {
                id: 1,
                name: "A. Guard".to_string(),
                team: "LAL".to_string(),
                position: "PG".to_string(),
                overall: 88.0,
                percentile: 100.0,
                attributes: BTreeMap::from([("speed".to_string(), 88)]),
                attribute_percentiles: BTreeMap::new(),
            }],
            league_averages: BTreeMap::from([("speed".to_string(), 88.0)]),
        })
    }

    #[test]
    fn json_codec_serializes_reports() {
        let body = WireBody::Report(sample_report());
        let bytes = JsonCodec.serialize(&body).expect("json serialize");
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["dataset"], "players-2026");
        assert_eq!(value["players"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn binary_codec_encodes_and_decodes_reports() {
        let body = WireBody::Report(sample_report());
        let bytes = BinaryCodec.serialize(&body).expect("binary serialize");
        let message = RatingReportMessage::decode(bytes.as_ref()).expect("decode");
        assert_eq!(message.dataset, "players-2026");
        assert_eq!(message.players.len(), 1);
    }

    #[test]
    fn binary_codec_rejects_dataset_listings() {
        let body = WireBody::Datasets(vec![DatasetSummary {
            id: "players-2026".to_string(),
            player_count: 2,
            updated_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }]);
        assert!(matches!(
            BinaryCodec.serialize(&body),
            Err(WireError::UnsupportedShape { .. })
        ));
        assert!(JsonCodec.serialize(&body).is_ok());
    }

    #[test]
    fn binary_codec_rejects_error_shape() {
        let body = WireBody::Error(ErrorBody {
            error: "serialization_failed".to_string(),
            message: "boom".to_string(),
            time: "2026-01-01T00:00:00Z".to_string(),
        });
        assert!(matches!(
            BinaryCodec.serialize(&body),
            Err(WireError::UnsupportedShape { shape: "error" })
        ));
    }

    #[test]
    fn codecs_declare_their_content_types() {
        assert_eq!(codec_for(WireFormat::Json).content_type(), MEDIA_TYPE_JSON);
        assert_eq!(
            codec_for(WireFormat::Binary).content_type(),
            MEDIA_TYPE_BINARY
        );
        assert!(codec_for(WireFormat::Binary).should_compress());
        assert!(!codec_for(WireFormat::Json).should_compress());
    }
}
