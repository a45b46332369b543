//! Computed rating types.
//!
//! A [`RatingReport`] is the shared in-memory object the cache and codecs
//! operate on. It is produced once per cache miss by
//! `application::ratings::compute_report` and serialized independently into
//! each wire format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A player enriched with rating context relative to its report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRating {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub position: String,
    /// Mean of the player's attribute values.
    pub overall: f64,
    /// Percentile of `overall` within the report's player set, 0–100.
    pub percentile: f64,
    pub attributes: BTreeMap<String, i64>,
    /// Per-attribute percentiles. Derivable from `attributes` plus the
    /// report's league averages; the binary encoding drops this map.
    pub attribute_percentiles: BTreeMap<String, f64>,
}

/// The full rating report for one dataset and filter combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingReport {
    pub dataset: String,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub players: Vec<PlayerRating>,
    pub league_averages: BTreeMap<String, f64>,
}

impl RatingReport {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
