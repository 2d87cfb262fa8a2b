use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use admissions_tracker::clock::SystemClock;
use admissions_tracker::config::AppConfig;
use admissions_tracker::error::AppError;
use admissions_tracker::telemetry;
use admissions_tracker::tracking::{InMemoryTrackerStore, TrackerService};

use crate::cli::ServeArgs;
use crate::infra::{retention_from, AppState};
use crate::routes::with_tracker_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryTrackerStore::default());
    let service = Arc::new(TrackerService::new(
        store,
        Arc::new(SystemClock),
        retention_from(&config.scheduler),
    ));

    let app = with_tracker_routes(service, config.scheduler.trigger_secret.as_str())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions progress tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}
