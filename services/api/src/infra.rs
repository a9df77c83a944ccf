use metrics_exporter_prometheus::PrometheusHandle;
use smart_kyc::config::WorkflowConfig;
use smart_kyc::workflows::kyc::{
    ApplicationRepository, InMemoryApplicationRepository, JsonFileRepository, RepositoryError,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store backing the service: the JSON file when one is configured, process memory otherwise.
pub(crate) fn open_repository(
    config: &WorkflowConfig,
) -> Result<Arc<dyn ApplicationRepository>, RepositoryError> {
    match &config.data_file {
        Some(path) => {
            let repository = JsonFileRepository::open(path)?;
            info!(path = %repository.path().display(), "using JSON application store");
            Ok(Arc::new(repository))
        }
        None => {
            info!("no KYC_DATA_FILE configured; applications are kept in memory");
            Ok(Arc::new(InMemoryApplicationRepository::default()))
        }
    }
}
