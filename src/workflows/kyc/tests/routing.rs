use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::workflows::kyc::analyzers::{
    BiometricAnalyzer, DocumentAnalyzer, RiskAnalyzer, SimulatedAnalyzers,
};
use crate::workflows::kyc::application_router;
use crate::workflows::kyc::contracts::{
    BiometricAnalysisPayload, DocumentAnalysisPayload, RiskAnalysisPayload,
};
use crate::workflows::kyc::domain::{ApplicationId, ApplicationStatus, DocumentType};
use crate::workflows::kyc::repository::{ApplicationRecord, ApplicationRepository};
use crate::workflows::kyc::router::{status_handler, KycRouterState};
use crate::workflows::kyc::service::{KycApplicationService, WorkflowPolicy};

/// Simulated analyzers that count document analyses.
#[derive(Default)]
struct CountingAnalyzers {
    documents: AtomicUsize,
}

impl DocumentAnalyzer for CountingAnalyzers {
    fn analyze_document(
        &self,
        document_type: DocumentType,
        file_name: &str,
    ) -> DocumentAnalysisPayload {
        self.documents.fetch_add(1, Ordering::SeqCst);
        SimulatedAnalyzers.analyze_document(document_type, file_name)
    }
}

impl BiometricAnalyzer for CountingAnalyzers {
    fn analyze_selfie(
        &self,
        application_id: &ApplicationId,
        file_name: &str,
        trigger_fail: bool,
    ) -> BiometricAnalysisPayload {
        SimulatedAnalyzers.analyze_selfie(application_id, file_name, trigger_fail)
    }
}

impl RiskAnalyzer for CountingAnalyzers {
    fn analyze_risk(&self, record: &ApplicationRecord) -> RiskAnalysisPayload {
        SimulatedAnalyzers.analyze_risk(record)
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn start(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(
            Request::post("/api/v1/applications/start")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "PENDING_DOCUMENTS");
    payload["application_id"]
        .as_str()
        .expect("application id")
        .to_string()
}

#[tokio::test]
async fn happy_path_over_http_is_approved() {
    let (service, _) = build_service();
    let router = application_router_with_service(Arc::new(service));
    let id = start(&router).await;

    for (document_type, file_name, expected) in [
        ("PASSPORT", "passport.jpg", "PENDING_ADDRESS_PROOF"),
        ("UTILITY_BILL", "bill.pdf", "PENDING_SELFIE"),
    ] {
        let response = router
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/applications/{id}/document"),
                json!({ "document_type": document_type, "file_name": file_name }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["status"], expected);
    }

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/applications/{id}/selfie"),
            json!({ "file_name": "selfie.jpg" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "PENDING_RISK_ANALYSIS");

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/applications/{id}/analyze"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "APPROVED");
    assert_eq!(payload["risk_score"], 10);
    assert_eq!(
        payload["documents"]["id_document"]["storage_reference"],
        format!("uploads/{id}/passport.jpg")
    );
}

#[tokio::test]
async fn spoofed_selfie_is_rejected_over_http() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let id = documents_accepted(&service);
    let router = application_router_with_service(service);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/applications/{id}/selfie"),
            json!({ "file_name": "spoof_attempt.jpg" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "REJECTED_LIVENESS");
    assert_eq!(
        payload["explanations"],
        json!(["Liveness check failed. Suspected spoof attempt."])
    );
}

#[tokio::test]
async fn unknown_application_returns_not_found() {
    let (service, _) = build_service();
    let router = application_router_with_service(Arc::new(service));

    let response = router
        .oneshot(post_json(
            "/api/v1/applications/does-not-exist/document",
            json!({ "document_type": "PASSPORT", "file_name": "passport.jpg" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload, json!({ "error": "Application not found" }));
}

#[tokio::test]
async fn document_route_validates_the_body() {
    let (service, _) = build_service();
    let router = application_router_with_service(Arc::new(service));
    let id = start(&router).await;

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/applications/{id}/document"),
            json!({ "document_type": "PASSPORT" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/applications/{id}/document"),
            json!({ "document_type": "LIBRARY_CARD", "file_name": "card.jpg" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "invalid document type 'LIBRARY_CARD'");
}

#[tokio::test]
async fn analyze_before_selfie_is_a_bad_request() {
    let (service, _) = build_service();
    let service = Arc::new(service);
    let id = documents_accepted(&service);
    let router = application_router_with_service(service.clone());

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/applications/{id}/analyze"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let record = service.get_application(&id).expect("fetched");
    assert_eq!(record.risk_score, None);
}

#[tokio::test]
async fn status_handler_returns_internal_error_when_store_is_down() {
    let state = KycRouterState {
        service: Arc::new(KycApplicationService::new(Arc::new(UnavailableRepository))),
        analyzers: Arc::new(SimulatedAnalyzers),
    };

    let response = status_handler::<UnavailableRepository, SimulatedAnalyzers>(
        State(state),
        Path("app-1".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn document_for_finished_application_is_refused_before_analysis() {
    let (service, repository) = build_service();
    let mut record = service.create_application().expect("created");
    record.status = ApplicationStatus::Approved;
    repository.update(record.clone()).expect("updated");

    let analyzers = Arc::new(CountingAnalyzers::default());
    let router = application_router(Arc::new(service), analyzers.clone());

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/applications/{}/document", record.application_id),
            json!({ "document_type": "PASSPORT", "file_name": "passport.jpg" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(analyzers.documents.load(Ordering::SeqCst), 0);
    let stored = repository
        .fetch(&record.application_id)
        .expect("fetch")
        .expect("stored");
    assert_eq!(stored, record);
}

#[tokio::test]
async fn rejected_slot_is_analyzed_again_when_retry_is_allowed() {
    let (service, _) = build_service_with_policy(WorkflowPolicy {
        allow_document_retry: true,
    });
    let analyzers = Arc::new(CountingAnalyzers::default());
    let router = application_router(Arc::new(service), analyzers.clone());
    let id = start(&router).await;
    let uri = format!("/api/v1/applications/{id}/document");

    let response = router
        .clone()
        .oneshot(post_json(
            &uri,
            json!({ "document_type": "TAMPERED_EXAMPLE", "file_name": "fake.png" }),
        ))
        .await
        .expect("response");
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "REJECTED_ID_DOCUMENT");

    let response = router
        .clone()
        .oneshot(post_json(
            &uri,
            json!({ "document_type": "UTILITY_BILL", "file_name": "bill.pdf" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(analyzers.documents.load(Ordering::SeqCst), 1);

    let response = router
        .oneshot(post_json(
            &uri,
            json!({ "document_type": "PASSPORT", "file_name": "passport.jpg" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "PENDING_ADDRESS_PROOF");
    assert_eq!(analyzers.documents.load(Ordering::SeqCst), 2);
}
