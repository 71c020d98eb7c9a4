use crate::cli::ServeArgs;
use crate::infra::{open_repository, AppState};
use crate::routes::with_fundraising_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fundraiser::config::AppConfig;
use fundraiser::error::AppError;
use fundraiser::fundraising::FundraisingService;
use fundraiser::telemetry;
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
    if let Some(database) = args.database.take() {
        config.database.path = database;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = open_repository(&config.database)?;
    let service = Arc::new(FundraisingService::new(repository, config.program));

    let app = with_fundraising_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        database = %config.database.path.display(),
        "fundraising tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
