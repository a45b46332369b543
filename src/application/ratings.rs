//! Rating computation.
//!
//! A pure pass over a dataset: apply the filter, derive each player's
//! overall and percentile standing, and aggregate league averages. The
//! cache layer treats this as the single source computation both format
//! variants are derived from.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::domain::players::Dataset;
use crate::domain::ratings::{PlayerRating, RatingReport};

/// Filter parameters for a rating request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingFilter {
    pub team: Option<String>,
    pub position: Option<String>,
    pub min_overall: Option<f64>,
}

impl RatingFilter {
    /// Canonical `(name, value)` pairs for cache key derivation. Unset
    /// fields are omitted so they cannot produce distinct keys.
    pub fn canonical_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(team) = &self.team {
            params.push(("team", team.clone()));
        }
        if let Some(position) = &self.position {
            params.push(("position", position.clone()));
        }
        if let Some(min_overall) = self.min_overall {
            params.push(("min_overall", format!("{min_overall}")));
        }
        params
    }
}

/// Compute the rating report for one dataset and filter combination.
///
/// Deterministic for a given input: players are ordered by overall
/// descending, then by id, so repeated computations produce identical
/// reports.
pub fn compute_report(dataset: &Dataset, filter: &RatingFilter) -> RatingReport {
    let mut rated: Vec<PlayerRating> = dataset
        .players
        .iter()
        .filter(|player| {
            filter
                .team
                .as_deref()
                .is_none_or(|team| player.team.eq_ignore_ascii_case(team))
                && filter
                    .position
                    .as_deref()
                    .is_none_or(|position| player.position.eq_ignore_ascii_case(position))
        })
        .map(|player| PlayerRating {
            id: player.id,
            name: player.name.clone(),
            team: player.team.clone(),
            position: player.position.clone(),
            overall: overall_of(&player.attributes),
            percentile: 0.0,
            attributes: player.attributes.clone(),
            attribute_percentiles: BTreeMap::new(),
        })
        .filter(|rating| {
            filter
                .min_overall
                .is_none_or(|min_overall| rating.overall >= min_overall)
        })
        .collect();

    let overalls: Vec<f64> = rated.iter().map(|r| r.overall).collect();
    let league_averages = league_averages(&rated);
    let columns = attribute_columns(&rated);

    for rating in &mut rated {
        rating.percentile = percentile_of(rating.overall, &overalls);
        rating.attribute_percentiles = rating
            .attributes
            .iter()
            .map(|(name, value)| {
                let column = columns.get(name).map(Vec::as_slice).unwrap_or(&[]);
                (name.clone(), percentile_of(*value as f64, column))
            })
            .collect();
    }

    rated.sort_by(|a, b| {
        b.overall
            .partial_cmp(&a.overall)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });

    RatingReport {
        dataset: dataset.id.clone(),
        generated_at: OffsetDateTime::now_utc(),
        players: rated,
        league_averages,
    }
}

fn overall_of(attributes: &BTreeMap<String, i64>) -> f64 {
    if attributes.is_empty() {
        return 0.0;
    }
    attributes.values().map(|v| *v as f64).sum::<f64>() / attributes.len() as f64
}

/// Percentile of `value` within `column`, 0–100. A single-element column
/// places the value at the 100th percentile.
fn percentile_of(value: f64, column: &[f64]) -> f64 {
    if column.len() <= 1 {
        return 100.0;
    }
    let below = column.iter().filter(|other| **other < value).count();
    100.0 * below as f64 / (column.len() - 1) as f64
}

fn league_averages(rated: &[PlayerRating]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for rating in rated {
        for (name, value) in &rating.attributes {
            let entry = sums.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += *value as f64;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(name, (sum, count))| (name, sum / count as f64))
        .collect()
}

fn attribute_columns(rated: &[PlayerRating]) -> BTreeMap<String, Vec<f64>> {
    let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for rating in rated {
        for (name, value) in &rating.attributes {
            columns.entry(name.clone()).or_default().push(*value as f64);
        }
    }
    columns
}
