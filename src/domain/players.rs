//! Player and dataset records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::error::DomainError;

/// A single player as stored in a dataset.
///
/// Attribute values are wide integers on the domain side; the binary wire
/// format narrows them to 32 bits (see `wire::convert`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub position: String,
    pub attributes: BTreeMap<String, i64>,
}

/// A named collection of players, the unit of storage and invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub players: Vec<PlayerRecord>,
}

impl Dataset {
    /// Validate invariants required before a dataset may be persisted.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("dataset id must not be empty"));
        }
        if self.players.is_empty() {
            return Err(DomainError::validation(
                "dataset must contain at least one player",
            ));
        }
        for player in &self.players {
            if player.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "player {} has an empty name",
                    player.id
                )));
            }
        }
        Ok(())
    }
}

/// Listing entry for a stored dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub player_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
