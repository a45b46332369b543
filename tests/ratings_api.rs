use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use flate2::read::GzDecoder;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use statline::application::datasets::DatasetService;
use statline::cache::{CacheConfig, SnapshotCache};
use statline::infra::http::{AppState, build_router};
use statline::infra::store::FsDatasetStore;
use statline::respond::FallbackMetrics;
use tempfile::TempDir;
use tower::ServiceExt;

const BINARY: &str = "application/x-binary";
const JSON: &str = "application/json";

async fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FsDatasetStore::open(dir.path())
        .await
        .expect("store should open");
    let cache = Arc::new(SnapshotCache::new(&CacheConfig::default()));
    let state = AppState {
        datasets: Arc::new(DatasetService::new(Arc::new(store), cache)),
        fallback: Arc::new(FallbackMetrics::new()),
    };
    (build_router(state, Duration::from_secs(10)), dir)
}

fn sample_dataset_json(id: &str) -> Value {
    json!({
        "id": id,
        "updated_at": "2026-08-01T00:00:00Z",
        "players": [
            {
                "id": 1,
                "name": "A. Guard",
                "team": "LAL",
                "position": "PG",
                "attributes": {"speed": 90, "shooting": 80}
            },
            {
                "id": 2,
                "name": "B. Forward",
                "team": "BOS",
                "position": "SF",
                "attributes": {"speed": 75, "shooting": 85}
            }
        ]
    })
}

async fn put_dataset(app: &Router, id: &str, body: Value) -> StatusCode {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/v1/datasets/{id}"))
        .header(header::CONTENT_TYPE, JSON)
        .body(Body::from(body.to_string()))
        .expect("request should build");
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    response.status()
}

async fn get_ratings(
    app: &Router,
    id: &str,
    accept: Option<&str>,
    query: &str,
) -> axum::http::Response<Body> {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/v1/players/{id}/ratings{query}"));
    if let Some(accept) = accept {
        builder = builder.header(header::ACCEPT, accept);
    }
    let request = builder.body(Body::empty()).expect("request should build");
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

async fn body_bytes(response: axum::http::Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
        .to_vec()
}

fn gunzip(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .expect("gzip body should decode");
    out
}

#[tokio::test]
async fn miss_then_hit_sets_cache_headers() {
    let (app, _dir) = test_app().await;
    assert_eq!(
        put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await,
        StatusCode::OK
    );

    let miss = get_ratings(&app, "players-2026", Some(JSON), "").await;
    assert_eq!(miss.status(), StatusCode::OK);
    assert!(miss.headers().get("x-cache-source").is_none());
    assert_eq!(miss.headers().get("x-cache-format").unwrap(), "json");

    let hit = get_ratings(&app, "players-2026", Some(JSON), "").await;
    assert_eq!(hit.status(), StatusCode::OK);
    assert_eq!(hit.headers().get("x-cache-source").unwrap(), "memory");

    let body: Value = serde_json::from_slice(&body_bytes(hit).await).unwrap();
    assert_eq!(body["dataset"], "players-2026");
    assert_eq!(body["players"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn binary_accept_returns_compressed_protobuf() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    let response = get_ratings(&app, "players-2026", Some(BINARY), "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), BINARY);
    assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
    assert_eq!(response.headers().get("x-cache-format").unwrap(), "binary");

    let raw = gunzip(&body_bytes(response).await);
    let message =
        <statline::wire::messages::RatingReportMessage as prost::Message>::decode(raw.as_slice())
            .expect("binary body should decode");
    assert_eq!(message.dataset, "players-2026");
    assert_eq!(message.players.len(), 2);
}

#[tokio::test]
async fn format_variants_are_cached_independently() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    // One JSON miss warms both variants.
    get_ratings(&app, "players-2026", Some(JSON), "").await;

    let binary_hit = get_ratings(&app, "players-2026", Some(BINARY), "").await;
    assert_eq!(binary_hit.headers().get("x-cache-source").unwrap(), "memory");
    assert_eq!(binary_hit.headers().get("x-cache-format").unwrap(), "binary");
}

#[tokio::test]
async fn equal_quality_prefers_first_listed_type() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    let response = get_ratings(
        &app,
        "players-2026",
        Some("application/json, application/x-binary"),
        "",
    )
    .await;
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), JSON);
}

#[tokio::test]
async fn quality_weights_override_header_order() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    let response = get_ratings(
        &app,
        "players-2026",
        Some("application/json;q=0.5, application/x-protobuf;q=0.9"),
        "",
    )
    .await;
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), BINARY);
}

#[tokio::test]
async fn missing_accept_defaults_to_json() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    let response = get_ratings(&app, "players-2026", None, "").await;
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), JSON);
}

#[tokio::test]
async fn filters_produce_distinct_cache_entries() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    get_ratings(&app, "players-2026", Some(JSON), "").await;

    // Different filter, different key: still a miss.
    let filtered = get_ratings(&app, "players-2026", Some(JSON), "?team=LAL").await;
    assert!(filtered.headers().get("x-cache-source").is_none());

    let body: Value = serde_json::from_slice(&body_bytes(filtered).await).unwrap();
    assert_eq!(body["players"].as_array().unwrap().len(), 1);
    assert_eq!(body["players"][0]["team"], "LAL");
}

#[tokio::test]
async fn overflowing_attributes_fall_back_to_json() {
    let (app, _dir) = test_app().await;
    let mut dataset = sample_dataset_json("players-2026");
    dataset["players"][0]["attributes"]["contract"] = json!(i64::from(i32::MAX) + 10);
    dataset["players"][1]["attributes"]["contract"] = json!(i64::from(i32::MAX) + 10);
    put_dataset(&app, "players-2026", dataset).await;

    let response = get_ratings(&app, "players-2026", Some(BINARY), "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), JSON);
    assert_eq!(
        response.headers().get("x-serialization-fallback").unwrap(),
        "conversion_failed"
    );

    // The degraded body still carries every record.
    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["players"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn put_invalidates_cached_snapshots() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    get_ratings(&app, "players-2026", Some(JSON), "").await;
    let hit = get_ratings(&app, "players-2026", Some(JSON), "").await;
    assert_eq!(hit.headers().get("x-cache-source").unwrap(), "memory");

    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;

    let after_update = get_ratings(&app, "players-2026", Some(JSON), "").await;
    assert!(after_update.headers().get("x-cache-source").is_none());
}

#[tokio::test]
async fn delete_removes_dataset_and_snapshots() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "players-2026", sample_dataset_json("players-2026")).await;
    get_ratings(&app, "players-2026", Some(JSON), "").await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/v1/datasets/players-2026")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let gone = get_ratings(&app, "players-2026", Some(JSON), "").await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/v1/datasets/players-2026")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_datasets_returns_summaries() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "alpha", sample_dataset_json("alpha")).await;
    put_dataset(&app, "beta", sample_dataset_json("beta")).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/datasets")
        .header(header::ACCEPT, JSON)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let summaries = body.as_array().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0]["id"], "alpha");
    assert_eq!(summaries[0]["player_count"], 2);
}

#[tokio::test]
async fn binary_accept_on_listing_degrades_to_json() {
    let (app, _dir) = test_app().await;
    put_dataset(&app, "alpha", sample_dataset_json("alpha")).await;
    put_dataset(&app, "beta", sample_dataset_json("beta")).await;

    // The listing shape is outside the binary codec's closed set, so the
    // marshal failure retries under the JSON codec.
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/datasets")
        .header(header::ACCEPT, BINARY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), JSON);
    assert_eq!(
        response.headers().get("x-serialization-fallback").unwrap(),
        "marshal_failed"
    );

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unsupported_content_type_is_rejected() {
    let (app, _dir) = test_app().await;
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/v1/datasets/players-2026")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("id,name\n"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"]["code"], "unsupported_media_type");
}

#[tokio::test]
async fn corrupt_gzip_upload_is_a_client_error() {
    let (app, _dir) = test_app().await;
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/v1/datasets/players-2026")
        .header(header::CONTENT_TYPE, JSON)
        .header(header::CONTENT_ENCODING, "gzip")
        .body(Body::from("definitely not gzip"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gzip_upload_is_accepted() {
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    let (app, _dir) = test_app().await;
    let payload = sample_dataset_json("players-2026").to_string();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/v1/datasets/players-2026")
        .header(header::CONTENT_TYPE, JSON)
        .header(header::CONTENT_ENCODING, "gzip")
        .body(Body::from(compressed))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn dataset_id_mismatch_is_rejected() {
    let (app, _dir) = test_app().await;
    let status = put_dataset(&app, "other-id", sample_dataset_json("players-2026")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn binary_dataset_upload_round_trips() {
    use prost::Message;
    use statline::wire::messages::{DatasetMessage, PlayerRecordMessage};

    let (app, _dir) = test_app().await;
    let message = DatasetMessage {
        id: "players-2026".to_string(),
        updated_at: 1_750_000_000,
        players: vec![PlayerRecordMessage {
            id: 1,
            name: "A. Guard".to_string(),
            team: "LAL".to_string(),
            position: "PG".to_string(),
            attributes: [("speed".to_string(), 90)].into_iter().collect(),
        }],
    };

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/api/v1/datasets/players-2026")
        .header(header::CONTENT_TYPE, BINARY)
        .body(Body::from(message.encode_to_vec()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ratings = get_ratings(&app, "players-2026", Some(JSON), "").await;
    assert_eq!(ratings.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&body_bytes(ratings).await).unwrap();
    assert_eq!(body["players"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn healthz_reports_cache_state() {
    let (app, _dir) = test_app().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cache_enabled"], true);
}
