//! Binary wire messages.
//!
//! Hand-annotated prost messages; the schema is small and closed, so no
//! build-time codegen is involved. Field tags are part of the wire contract
//! and must never be reused.

use std::collections::HashMap;

/// One rated player on the wire. Attribute values are narrowed to 32 bits;
/// per-attribute percentiles are dropped as derivable from `attributes`
/// plus the report's league averages.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerRatingMessage {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub team: String,
    #[prost(string, tag = "4")]
    pub position: String,
    #[prost(double, tag = "5")]
    pub overall: f64,
    #[prost(double, tag = "6")]
    pub percentile: f64,
    #[prost(map = "string, int32", tag = "7")]
    pub attributes: HashMap<String, i32>,
}

/// The binary materialization of a rating report.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RatingReportMessage {
    #[prost(string, tag = "1")]
    pub dataset: String,
    /// Unix seconds.
    #[prost(int64, tag = "2")]
    pub generated_at: i64,
    #[prost(message, repeated, tag = "3")]
    pub players: Vec<PlayerRatingMessage>,
    #[prost(map = "string, double", tag = "4")]
    pub league_averages: HashMap<String, f64>,
    /// Records dropped during conversion; lets clients observe the
    /// discrepancy between source and wire record counts.
    #[prost(uint32, tag = "5")]
    pub skipped_records: u32,
}

/// A stored player in the inbound dataset encoding.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlayerRecordMessage {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub team: String,
    #[prost(string, tag = "4")]
    pub position: String,
    #[prost(map = "string, int32", tag = "5")]
    pub attributes: HashMap<String, i32>,
}

/// A full dataset as uploaded in binary form.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DatasetMessage {
    #[prost(string, tag = "1")]
    pub id: String,
    /// Unix seconds.
    #[prost(int64, tag = "2")]
    pub updated_at: i64,
    #[prost(message, repeated, tag = "3")]
    pub players: Vec<PlayerRecordMessage>,
}

