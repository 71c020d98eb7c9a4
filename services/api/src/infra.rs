use fundraiser::config::DatabaseConfig;
use fundraiser::fundraising::{RepositoryError, SqliteRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Opens the configured database, creating the schema when missing.
pub(crate) fn open_repository(
    config: &DatabaseConfig,
) -> Result<Arc<SqliteRepository>, RepositoryError> {
    let repository = if config.is_in_memory() {
        SqliteRepository::in_memory()?
    } else {
        SqliteRepository::open(&config.path)?
    };
    Ok(Arc::new(repository))
}
