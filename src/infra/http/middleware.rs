use std::time::{Duration, Instant};

use axum::response::IntoResponse;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{error, warn};

use crate::application::error::ErrorReport;

use super::error::ApiError;

/// Race the downstream handler against the configured deadline. The
/// handler runs on its own task so a timed-out request is abandoned
/// rather than cancelled mid-write, and a panicking handler surfaces as
/// a 500 instead of tearing down the connection.
pub async fn enforce_timeout(timeout: Duration, request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let handler = tokio::spawn(next.run(request));

    match tokio::time::timeout(timeout, handler).await {
        Ok(Ok(response)) => response,
        Ok(Err(join_error)) => {
            error!(
                target = "statline::http",
                method = %method,
                path = %path,
                error = %join_error,
                "request handler panicked",
            );
            ApiError::internal(None).into_response()
        }
        Err(_) => {
            warn!(
                target = "statline::http",
                method = %method,
                path = %path,
                timeout_ms = timeout.as_millis() as u64,
                "request deadline exceeded",
            );
            ApiError::timeout().into_response()
        }
    }
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "statline::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                "request failed",
            );
        } else {
            warn!(
                target = "statline::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                "client request error",
            );
        }
    }

    response
}
