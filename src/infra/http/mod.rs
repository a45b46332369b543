//! HTTP surface: router assembly, handlers, middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::routing::{get, put};

use crate::application::datasets::DatasetService;
use crate::respond::FallbackMetrics;

pub mod error;
pub mod handlers;
pub mod middleware;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub datasets: Arc<DatasetService>,
    pub fallback: Arc<FallbackMetrics>,
}

/// Assemble the API router. The timeout guard wraps every route; the
/// response logger sits outermost so it also observes timeouts.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/v1/datasets", get(handlers::list_datasets))
        .route(
            "/api/v1/datasets/{id}",
            put(handlers::put_dataset).delete(handlers::delete_dataset),
        )
        .route(
            "/api/v1/players/{dataset}/ratings",
            get(handlers::get_ratings),
        )
        .layer(axum::middleware::from_fn(
            move |request: Request<Body>, next: Next| {
                middleware::enforce_timeout(request_timeout, request, next)
            },
        ))
        .layer(axum::middleware::from_fn(middleware::log_responses))
        .with_state(state)
}
