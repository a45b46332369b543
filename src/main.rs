use std::{process, sync::Arc};

use statline::{
    application::datasets::DatasetService,
    application::error::AppError,
    cache::SnapshotCache,
    config,
    infra::{
        error::InfraError,
        http::{self, AppState},
        store::FsDatasetStore,
        telemetry,
    },
    respond::FallbackMetrics,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let store = FsDatasetStore::open(settings.datasets.directory.clone())
        .await
        .map_err(|err| AppError::unexpected(format!("failed to open dataset store: {err}")))?;

    let cache = Arc::new(SnapshotCache::new(&settings.cache));
    let sweeper = cache.spawn_sweeper();
    if sweeper.is_some() {
        info!(
            interval_secs = settings.cache.sweep_interval_secs,
            ttl_secs = settings.cache.snapshot_ttl_secs,
            "snapshot cache enabled"
        );
    } else {
        info!("snapshot cache disabled, every request recomputes");
    }

    let state = AppState {
        datasets: Arc::new(DatasetService::new(Arc::new(store), cache)),
        fallback: Arc::new(FallbackMetrics::new()),
    };

    let router = http::build_router(state, settings.server.request_timeout);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let result = axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    if let Some(handle) = sweeper {
        handle.abort();
        let _ = handle.await;
    }

    result
}
