//! Domain↔wire conversion.
//!
//! Pure functions in both directions. Integer attributes narrow from i64 to
//! i32 on the way out and widen back on the way in; narrowing rejects on
//! overflow rather than truncating. A record that fails conversion inside a
//! batch is logged and skipped, with the skip count carried on the wire
//! message; a non-empty batch in which every record fails is an error.

use std::collections::{BTreeMap, HashMap};

use time::OffsetDateTime;
use tracing::warn;

use crate::domain::players::{Dataset, PlayerRecord};
use crate::domain::ratings::{PlayerRating, RatingReport};

use super::error::ConvertError;
use super::messages::{
    DatasetMessage, PlayerRatingMessage, PlayerRecordMessage, RatingReportMessage,
};

fn narrow_attributes(
    attributes: &BTreeMap<String, i64>,
) -> Result<HashMap<String, i32>, ConvertError> {
    let mut narrowed = HashMap::with_capacity(attributes.len());
    for (name, value) in attributes {
        let value = i32::try_from(*value).map_err(|_| ConvertError::AttributeOverflow {
            attribute: name.clone(),
            value: *value,
        })?;
        narrowed.insert(name.clone(), value);
    }
    Ok(narrowed)
}

fn widen_attributes(attributes: &HashMap<String, i32>) -> BTreeMap<String, i64> {
    attributes
        .iter()
        .map(|(name, value)| (name.clone(), i64::from(*value)))
        .collect()
}

fn timestamp_from_wire(field: &'static str, unix: i64) -> Result<OffsetDateTime, ConvertError> {
    OffsetDateTime::from_unix_timestamp(unix)
        .map_err(|_| ConvertError::InvalidTimestamp { field, value: unix })
}

/// Convert one rated player to its wire form.
pub fn rating_to_wire(rating: &PlayerRating) -> Result<PlayerRatingMessage, ConvertError> {
    if rating.name.is_empty() {
        return Err(ConvertError::MissingField { field: "name" });
    }
    Ok(PlayerRatingMessage {
        id: rating.id,
        name: rating.name.clone(),
        team: rating.team.clone(),
        position: rating.position.clone(),
        overall: rating.overall,
        percentile: rating.percentile,
        attributes: narrow_attributes(&rating.attributes)?,
    })
}

/// Convert one wire player back to a rated player.
///
/// Per-attribute percentiles are dropped by the binary encoding and are not
/// rehydrated; the returned map is empty.
pub fn rating_from_wire(message: &PlayerRatingMessage) -> Result<PlayerRating, ConvertError> {
    if message.name.is_empty() {
        return Err(ConvertError::MissingField { field: "name" });
    }
    Ok(PlayerRating {
        id: message.id,
        name: message.name.clone(),
        team: message.team.clone(),
        position: message.position.clone(),
        overall: message.overall,
        percentile: message.percentile,
        attributes: widen_attributes(&message.attributes),
        attribute_percentiles: BTreeMap::new(),
    })
}

/// Convert a rating report to its wire message.
pub fn report_to_wire(report: &RatingReport) -> Result<RatingReportMessage, ConvertError> {
    if report.dataset.is_empty() {
        return Err(ConvertError::MissingField { field: "dataset" });
    }
    let mut players = Vec::with_capacity(report.players.len());
    let mut skipped = 0usize;
    let mut last_error = None;
    for rating in &report.players {
        match rating_to_wire(rating) {
            Ok(message) => players.push(message),
            Err(err) => {
                warn!(player_id = rating.id, error = %err, "record skipped during wire conversion");
                skipped += 1;
                last_error = Some(err);
            }
        }
    }
    if players.is_empty()
        && let Some(err) = last_error
    {
        warn!(failed = skipped, error = %err, "wire conversion failed for every record");
        return Err(ConvertError::AllRecordsFailed { failed: skipped });
    }
    Ok(RatingReportMessage {
        dataset: report.dataset.clone(),
        generated_at: report.generated_at.unix_timestamp(),
        players,
        league_averages: report.league_averages.clone().into_iter().collect(),
        skipped_records: skipped as u32,
    })
}

/// Convert a wire message back to a rating report.
pub fn report_from_wire(message: &RatingReportMessage) -> Result<RatingReport, ConvertError> {
    if message.dataset.is_empty() {
        return Err(ConvertError::MissingField { field: "dataset" });
    }
    let generated_at = timestamp_from_wire("generated_at", message.generated_at)?;
    let mut players = Vec::with_capacity(message.players.len());
    for player in &message.players {
        match rating_from_wire(player) {
            Ok(rating) => players.push(rating),
            Err(err) => {
                warn!(player_id = player.id, error = %err, "record skipped during wire decode");
            }
        }
    }
    Ok(RatingReport {
        dataset: message.dataset.clone(),
        generated_at,
        players,
        league_averages: message
            .league_averages
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
    })
}

/// Convert an uploaded binary dataset to its domain form.
pub fn dataset_from_wire(message: DatasetMessage) -> Result<Dataset, ConvertError> {
    if message.id.is_empty() {
        return Err(ConvertError::MissingField { field: "id" });
    }
    let updated_at = timestamp_from_wire("updated_at", message.updated_at)?;
    let players = message
        .players
        .into_iter()
        .map(|player| PlayerRecord {
            id: player.id,
            name: player.name,
            team: player.team,
            position: player.position,
            attributes: widen_attributes(&player.attributes),
        })
        .collect();
    Ok(Dataset {
        id: message.id,
        updated_at,
        players,
    })
}

/// Convert a dataset to the wire encoding used for uploads.
pub fn dataset_to_wire(dataset: &Dataset) -> Result<DatasetMessage, ConvertError> {
    if dataset.id.is_empty() {
        return Err(ConvertError::MissingField { field: "id" });
    }
    let mut players = Vec::with_capacity(dataset.players.len());
    for player in &dataset.players {
        players.push(PlayerRecordMessage {
            id: player.id,
            name: player.name.clone(),
            team: player.team.clone(),
            position: player.position.clone(),
            attributes: narrow_attributes(&player.attributes)?,
        });
    }
    Ok(DatasetMessage {
        id: dataset.id.clone(),
        updated_at: dataset.updated_at.unix_timestamp(),
        players,
    })
}
