use crate::cli::ServeArgs;
use crate::infra::{seed_directory, AppState};
use crate::routes::with_booking_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use boatiesmate::config::AppConfig;
use boatiesmate::error::AppError;
use boatiesmate::telemetry;
use boatiesmate::workflows::booking::{BookingService, BookingServiceError, InMemoryBookingLedger};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let ledger = Arc::new(InMemoryBookingLedger::default());
    let directory =
        Arc::new(seed_directory(Utc::now().date_naive()).map_err(BookingServiceError::from)?);
    let booking_service = Arc::new(BookingService::new(
        ledger,
        directory,
        config.booking,
    ));

    let app = with_booking_routes(booking_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "mooring booking service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
