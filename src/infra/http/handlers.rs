//! API handlers for datasets and rating reports.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use prost::Message;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::application::datasets::dataset_resource;
use crate::application::error::AppError;
use crate::application::ratings::{RatingFilter, compute_report};
use crate::cache::{SnapshotPayload, base_key};
use crate::domain::error::DomainError;
use crate::domain::players::Dataset;
use crate::respond::{
    CacheOutcome, FallbackReason, compress, serialize_with_fallback, write_response,
};
use crate::wire::codec::WireBody;
use crate::wire::convert::dataset_from_wire;
use crate::wire::error::WireError;
use crate::wire::messages::DatasetMessage;
use crate::wire::negotiate::{MEDIA_TYPE_BINARY_ALT, negotiate};
use crate::wire::{MEDIA_TYPE_BINARY, MEDIA_TYPE_JSON};

use super::AppState;
use super::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct RatingQuery {
    pub team: Option<String>,
    pub position: Option<String>,
    pub min_overall: Option<f64>,
}

impl From<RatingQuery> for RatingFilter {
    fn from(query: RatingQuery) -> Self {
        Self {
            team: query.team,
            position: query.position,
            min_overall: query.min_overall,
        }
    }
}

/// GET /api/v1/players/{dataset}/ratings
///
/// The cache is consulted under the negotiated format's key; a miss
/// computes once and populates both format variants before responding.
pub async fn get_ratings(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    Query(query): Query<RatingQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let format = negotiate(accept_header(&headers));
    let filter = RatingFilter::from(query);
    let base = base_key(&dataset_resource(&dataset_id), &filter.canonical_params());

    if let Some(snapshot) = state.datasets.cache().get_cached(&base, format) {
        debug!(base = %base, format = %format, "serving cached snapshot");
        let body = match snapshot.payload {
            SnapshotPayload::Json(report) => WireBody::Report(report),
            SnapshotPayload::Binary(message) => WireBody::ReportWire(message),
        };
        let serialized = serialize_with_fallback(format, &body, &state.fallback);
        return Ok(write_response(serialized, CacheOutcome::Hit));
    }

    let stored = state
        .datasets
        .retrieve(&dataset_id)
        .await
        .map_err(app_error)?
        .ok_or_else(|| ApiError::not_found("Dataset not found"))?;

    let report = Arc::new(compute_report(&stored.dataset, &filter));
    state
        .datasets
        .cache()
        .set_both(&base, &report, &stored.fingerprint);

    let serialized = serialize_with_fallback(format, &WireBody::Report(report), &state.fallback);
    Ok(write_response(serialized, CacheOutcome::Miss))
}

/// GET /api/v1/datasets
///
/// Dataset listings are cheap to assemble and never cached; only rating
/// snapshots go through the cache. The listing has no binary encoding, so
/// a binary Accept degrades to JSON through the fallback chain.
pub async fn list_datasets(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let format = negotiate(accept_header(&headers));
    let summaries = state.datasets.list().await.map_err(app_error)?;
    let serialized =
        serialize_with_fallback(format, &WireBody::Datasets(summaries), &state.fallback);
    Ok(write_response(serialized, CacheOutcome::Miss))
}

/// PUT /api/v1/datasets/{id}
///
/// Accepts a JSON or binary dataset body, optionally gzip-encoded.
/// Inbound decode failures are request errors: there is no fallback on
/// the way in.
pub async fn put_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let bytes = decode_body(&state, &headers, body)?;
    let dataset = parse_dataset(&state, &headers, &bytes)?;

    if dataset.id != dataset_id {
        return Err(ApiError::invalid_input(
            "Dataset id mismatch",
            Some(format!(
                "body declares `{}`, path addresses `{dataset_id}`",
                dataset.id
            )),
        ));
    }

    let fingerprint = state
        .datasets
        .store_dataset(&dataset)
        .await
        .map_err(app_error)?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "id": dataset.id,
            "players": dataset.players.len(),
            "fingerprint": fingerprint,
        })),
    )
        .into_response())
}

/// DELETE /api/v1/datasets/{id}
pub async fn delete_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
) -> Result<Response, ApiError> {
    let existed = state.datasets.delete(&dataset_id).await.map_err(app_error)?;
    if existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(ApiError::not_found("Dataset not found"))
    }
}

/// GET /healthz
pub async fn healthz(State(state): State<AppState>) -> Response {
    let last_fallback = state
        .fallback
        .last_error_at()
        .and_then(|at| at.format(&time::format_description::well_known::Rfc3339).ok());
    Json(json!({
        "status": "ok",
        "cache_enabled": state.datasets.cache().is_enabled(),
        "cached_snapshots": state.datasets.cache().len(),
        "last_fallback_at": last_fallback,
    }))
    .into_response()
}

fn accept_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(ACCEPT).and_then(|value| value.to_str().ok())
}

/// Undo a gzip Content-Encoding. A corrupt stream is the client's error
/// and never enters the serialization fallback chain.
fn decode_body(state: &AppState, headers: &HeaderMap, body: Bytes) -> Result<Bytes, ApiError> {
    let encoding = headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok());
    match encoding {
        None | Some("identity") => Ok(body),
        Some("gzip") => compress::gunzip(&body).map_err(|err| {
            state.fallback.record(FallbackReason::DecompressionFailed, &err);
            ApiError::bad_request("Request body could not be decompressed", Some(err.to_string()))
        }),
        Some(other) => Err(ApiError::bad_request(
            "Unsupported content encoding",
            Some(format!("`{other}` is not supported, use gzip or identity")),
        )),
    }
}

fn parse_dataset(state: &AppState, headers: &HeaderMap, bytes: &[u8]) -> Result<Dataset, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim())
        .unwrap_or(MEDIA_TYPE_JSON);

    match content_type {
        MEDIA_TYPE_JSON => serde_json::from_slice(bytes).map_err(|err| {
            ApiError::bad_request("Dataset body is not valid JSON", Some(err.to_string()))
        }),
        MEDIA_TYPE_BINARY | MEDIA_TYPE_BINARY_ALT => {
            let message = DatasetMessage::decode(bytes).map_err(|err| {
                ApiError::bad_request(
                    "Dataset body is not a valid binary message",
                    Some(err.to_string()),
                )
            })?;
            dataset_from_wire(message).map_err(|err| {
                let wire_err = WireError::FromWire(err);
                state
                    .fallback
                    .record(FallbackReason::ConversionFailed, &wire_err);
                ApiError::invalid_input(
                    "Dataset message could not be converted",
                    Some(wire_err.to_string()),
                )
            })
        }
        other => {
            let err = WireError::UnsupportedShape {
                shape: "request content type",
            };
            state.fallback.record(FallbackReason::ClientIncompatible, &err);
            Err(ApiError::unsupported_media_type(Some(format!(
                "`{other}` is not supported, use {MEDIA_TYPE_JSON} or {MEDIA_TYPE_BINARY}"
            ))))
        }
    }
}

fn app_error(error: AppError) -> ApiError {
    match error {
        AppError::Domain(DomainError::NotFound { .. }) => ApiError::not_found("Dataset not found"),
        AppError::Domain(DomainError::Validation { message }) => {
            ApiError::invalid_input("Dataset failed validation", Some(message))
        }
        AppError::Validation { message } => {
            ApiError::invalid_input("Request failed validation", Some(message))
        }
        AppError::Infra(err) => ApiError::internal(Some(err.to_string())),
        AppError::Unexpected { message } => ApiError::internal(Some(message)),
    }
}
