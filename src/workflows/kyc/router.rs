use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::analyzers::AnalysisSuite;
use super::domain::{ApplicationId, DocumentType, WorkflowEvent};
use super::engine::DocumentUpload;
use super::repository::{ApplicationRecord, ApplicationRepository};
use super::service::{KycApplicationService, KycServiceError};

/// Shared state for the application routes.
pub struct KycRouterState<R: ?Sized, Z> {
    pub service: Arc<KycApplicationService<R>>,
    pub analyzers: Arc<Z>,
}

impl<R: ?Sized, Z> Clone for KycRouterState<R, Z> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            analyzers: Arc::clone(&self.analyzers),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentUploadRequest {
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelfieUploadRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    /// Forces a face mismatch in the simulated biometric analyzer.
    #[serde(default)]
    pub trigger_fail: bool,
}

/// Router builder exposing the application lifecycle over HTTP.
pub fn application_router<R, Z>(
    service: Arc<KycApplicationService<R>>,
    analyzers: Arc<Z>,
) -> Router
where
    R: ApplicationRepository + ?Sized + 'static,
    Z: AnalysisSuite + 'static,
{
    Router::new()
        .route("/api/v1/applications/start", post(start_handler::<R, Z>))
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R, Z>),
        )
        .route(
            "/api/v1/applications/:application_id/document",
            post(document_handler::<R, Z>),
        )
        .route(
            "/api/v1/applications/:application_id/selfie",
            post(selfie_handler::<R, Z>),
        )
        .route(
            "/api/v1/applications/:application_id/analyze",
            post(analyze_handler::<R, Z>),
        )
        .with_state(KycRouterState { service, analyzers })
}

fn storage_reference(application_id: &ApplicationId, file_name: &str) -> String {
    format!("uploads/{application_id}/{file_name}")
}

fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn error_response(err: KycServiceError) -> Response {
    match err {
        KycServiceError::NotFound(_) => {
            let payload = json!({ "error": "Application not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        KycServiceError::InvalidState { .. } => bad_request(err.to_string()),
        KycServiceError::Store(_) => {
            error!(error = %err, "application store failure");
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

/// Reject early when the application cannot take `event`, before any analyzer runs.
///
/// The service repeats the check under the record lock; this one only spares the analyzer call.
fn precheck<R>(
    service: &KycApplicationService<R>,
    id: &ApplicationId,
    event: WorkflowEvent,
) -> Result<ApplicationRecord, KycServiceError>
where
    R: ApplicationRepository + ?Sized + 'static,
{
    let record = service.get_application(id)?;
    if service.policy().admits(record.status, event) {
        Ok(record)
    } else {
        Err(KycServiceError::InvalidState {
            status: record.status,
            event,
        })
    }
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, KycServiceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn start_handler<R, Z>(State(state): State<KycRouterState<R, Z>>) -> Response
where
    R: ApplicationRepository + ?Sized + 'static,
    Z: AnalysisSuite + 'static,
{
    respond(StatusCode::CREATED, state.service.create_application())
}

pub(crate) async fn status_handler<R, Z>(
    State(state): State<KycRouterState<R, Z>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + ?Sized + 'static,
    Z: AnalysisSuite + 'static,
{
    let id = ApplicationId(application_id);
    respond(StatusCode::OK, state.service.get_application(&id))
}

pub(crate) async fn document_handler<R, Z>(
    State(state): State<KycRouterState<R, Z>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<DocumentUploadRequest>,
) -> Response
where
    R: ApplicationRepository + ?Sized + 'static,
    Z: AnalysisSuite + 'static,
{
    let id = ApplicationId(application_id);
    if let Err(err) = state.service.get_application(&id) {
        return error_response(err);
    }

    let (Some(raw_type), Some(file_name)) = (request.document_type, request.file_name) else {
        return bad_request("Missing 'document_type' or 'file_name' in request body");
    };
    let document_type = match raw_type.parse::<DocumentType>() {
        Ok(document_type) => document_type,
        Err(err) => return bad_request(err.to_string()),
    };
    let event = WorkflowEvent::DocumentUpload(document_type.slot());
    if let Err(err) = precheck(&state.service, &id, event) {
        return error_response(err);
    }

    let payload = state.analyzers.analyze_document(document_type, &file_name);
    let upload = DocumentUpload::new(document_type, storage_reference(&id, &file_name));
    respond(
        StatusCode::OK,
        state.service.submit_document(&id, upload, payload),
    )
}

pub(crate) async fn selfie_handler<R, Z>(
    State(state): State<KycRouterState<R, Z>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<SelfieUploadRequest>,
) -> Response
where
    R: ApplicationRepository + ?Sized + 'static,
    Z: AnalysisSuite + 'static,
{
    let id = ApplicationId(application_id);
    if let Err(err) = precheck(&state.service, &id, WorkflowEvent::SelfieUpload) {
        return error_response(err);
    }

    let Some(file_name) = request.file_name else {
        return bad_request("Missing 'file_name' in request body");
    };

    let payload = state
        .analyzers
        .analyze_selfie(&id, &file_name, request.trigger_fail);
    respond(
        StatusCode::OK,
        state
            .service
            .submit_selfie(&id, storage_reference(&id, &file_name), payload),
    )
}

pub(crate) async fn analyze_handler<R, Z>(
    State(state): State<KycRouterState<R, Z>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + ?Sized + 'static,
    Z: AnalysisSuite + 'static,
{
    let id = ApplicationId(application_id);
    let record = match precheck(&state.service, &id, WorkflowEvent::RiskAnalysis) {
        Ok(record) => record,
        Err(err) => return error_response(err),
    };

    let payload = state.analyzers.analyze_risk(&record);
    respond(
        StatusCode::OK,
        state.service.submit_risk_analysis(&id, payload),
    )
}
