use crate::cli::ServeArgs;
use crate::infra::{open_repository, AppState};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use smart_kyc::config::AppConfig;
use smart_kyc::error::AppError;
use smart_kyc::telemetry;
use smart_kyc::workflows::kyc::{KycApplicationService, SimulatedAnalyzers, WorkflowPolicy};
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

    let repository = open_repository(&config.workflow)?;
    let policy = WorkflowPolicy::from(&config.workflow);
    let application_service = Arc::new(KycApplicationService::with_policy(repository, policy));

    let app = with_application_routes(application_service, Arc::new(SimulatedAnalyzers))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        allow_document_retry = policy.allow_document_retry,
        "kyc workflow service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
