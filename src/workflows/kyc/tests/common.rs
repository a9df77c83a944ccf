use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::response::Response;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::kyc::analyzers::SimulatedAnalyzers;
use crate::workflows::kyc::contracts::{
    BiometricAnalysis, BiometricAnalysisPayload, DocumentAnalysis, DocumentAnalysisPayload,
    DocumentForensics, FaceMatch, FaceMatchStatus, ForensicsStatus, LivenessCheck, LivenessStatus,
    ModelInfo, Normalized, RiskAnalysis, RiskAnalysisPayload, RiskDecision, SelfieStatus,
};
use crate::workflows::kyc::domain::{ApplicationId, DocumentType};
use crate::workflows::kyc::engine::DocumentUpload;
use crate::workflows::kyc::repository::{
    ApplicationRecord, ApplicationRepository, RepositoryError,
};
use crate::workflows::kyc::service::{KycApplicationService, WorkflowPolicy};
use crate::workflows::kyc::storage::InMemoryApplicationRepository;
use crate::workflows::kyc::application_router;

pub(super) fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn fresh_record(id: &str) -> ApplicationRecord {
    ApplicationRecord::new(ApplicationId(id.to_string()), at(0))
}

pub(super) fn fields(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn forensics(status: ForensicsStatus, reason: Option<&str>) -> DocumentForensics {
    DocumentForensics {
        status,
        confidence_score: Some(0.95),
        reason: reason.map(str::to_string),
        checks_passed: Vec::new(),
        checks_failed: Vec::new(),
    }
}

pub(super) fn passport_analysis() -> DocumentAnalysis {
    DocumentAnalysis {
        extracted_data: fields(&[
            ("first_name", "JANE"),
            ("last_name", "DOE"),
            ("document_number", "P01234567"),
            ("dob", "1990-01-01"),
        ]),
        forensics: forensics(ForensicsStatus::Clear, None),
        model_info: ModelInfo::new(),
    }
}

pub(super) fn utility_bill_analysis() -> DocumentAnalysis {
    DocumentAnalysis {
        extracted_data: fields(&[
            ("name", "JANE DOE"),
            ("address", "123 MAIN ST"),
            ("issue_date", "2025-05-01"),
            ("provider", "City Electric"),
        ]),
        forensics: forensics(ForensicsStatus::Clear, None),
        model_info: ModelInfo::new(),
    }
}

pub(super) fn rejected_analysis(status: ForensicsStatus, reason: Option<&str>) -> DocumentAnalysis {
    DocumentAnalysis {
        extracted_data: fields(&[("first_name", "J0HN")]),
        forensics: forensics(status, reason),
        model_info: ModelInfo::new(),
    }
}

pub(super) fn biometric(status: SelfieStatus, reason: &str) -> BiometricAnalysis {
    BiometricAnalysis {
        status,
        reason: reason.to_string(),
        liveness_check: Some(LivenessCheck {
            status: LivenessStatus::Real,
            confidence: 0.98,
        }),
        face_match: FaceMatch {
            status: FaceMatchStatus::Match,
            match_score: 0.97,
            id_document_face_ref: None,
            selfie_face_ref: None,
        },
        model_info: ModelInfo::new(),
    }
}

pub(super) fn risk(decision: RiskDecision, score: i64, explanations: &[&str]) -> RiskAnalysis {
    RiskAnalysis {
        decision,
        risk_score: score,
        xai_explanations: explanations.iter().map(|line| line.to_string()).collect(),
        model_info: ModelInfo::new(),
        analyzed_at: None,
    }
}

pub(super) fn complete<T>(analysis: T) -> Normalized<T> {
    Normalized::complete(analysis)
}

pub(super) fn passport_upload() -> DocumentUpload {
    DocumentUpload::new(DocumentType::Passport, "uploads/test/passport.jpg")
}

pub(super) fn bill_upload() -> DocumentUpload {
    DocumentUpload::new(DocumentType::UtilityBill, "uploads/test/bill.pdf")
}

pub(super) fn tampered_upload() -> DocumentUpload {
    DocumentUpload::new(DocumentType::TamperedExample, "uploads/test/fake.png")
}

pub(super) fn passport_payload() -> DocumentAnalysisPayload {
    passport_analysis().into()
}

pub(super) fn bill_payload() -> DocumentAnalysisPayload {
    utility_bill_analysis().into()
}

pub(super) fn clear_selfie_payload() -> BiometricAnalysisPayload {
    biometric(SelfieStatus::Clear, "Biometric verification successful.").into()
}

pub(super) fn risk_payload(decision: RiskDecision, score: i64) -> RiskAnalysisPayload {
    risk(decision, score, &["scored by test"]).into()
}

pub(super) type MemoryService = KycApplicationService<InMemoryApplicationRepository>;

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryApplicationRepository>) {
    build_service_with_policy(WorkflowPolicy::default())
}

pub(super) fn build_service_with_policy(
    policy: WorkflowPolicy,
) -> (MemoryService, Arc<InMemoryApplicationRepository>) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let service = KycApplicationService::with_policy(repository.clone(), policy);
    (service, repository)
}

/// Drive a fresh application up to `PENDING_SELFIE`.
pub(super) fn documents_accepted(service: &MemoryService) -> ApplicationId {
    let record = service.create_application().expect("created");
    let id = record.application_id;
    service
        .submit_document(&id, passport_upload(), passport_payload())
        .expect("passport accepted");
    service
        .submit_document(&id, bill_upload(), bill_payload())
        .expect("bill accepted");
    id
}

pub(super) fn application_router_with_service(service: Arc<MemoryService>) -> Router {
    application_router(service, Arc::new(SimulatedAnalyzers))
}

/// Store that serves reads from a snapshot but refuses every write.
pub(super) struct ReadOnlyRepository {
    pub(super) inner: InMemoryApplicationRepository,
}

impl ApplicationRepository for ReadOnlyRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn update(&self, _record: ApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self, limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.inner.list(limit)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn update(&self, _record: ApplicationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn list(&self, _limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("smart-kyc-{}-{}", std::process::id(), ApplicationId::generate()))
        .join(name)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
