//! Identity-verification workflow for onboarding applications.
//!
//! An application collects an identity document and a proof of address, then a selfie, and
//! finally a risk decision. Analyzer results arrive as the contracts in [`contracts`]; the
//! [`engine`] turns each one into the next application record, and the [`service`] wraps the
//! engine with per-application locking and persistence.

pub mod analyzers;
pub mod contracts;
pub mod domain;
pub mod engine;
pub mod export;
pub mod fusion;
pub(crate) mod locks;
pub mod repository;
pub mod router;
pub mod service;
pub mod storage;

#[cfg(test)]
mod tests;

pub use analyzers::{
    AnalysisSuite, BiometricAnalyzer, DocumentAnalyzer, RiskAnalyzer, SimulatedAnalyzers,
};
pub use contracts::{
    BiometricAnalysis, BiometricAnalysisPayload, DocumentAnalysis, DocumentAnalysisPayload,
    MalformedAnalysisResult, Normalized, RiskAnalysis, RiskAnalysisPayload, RiskDecision,
};
pub use domain::{
    ApplicationId, ApplicationStatus, DocumentSlot, DocumentStatus, DocumentType, IdentityData,
    WorkflowEvent,
};
pub use engine::{DocumentUpload, WorkflowEngine};
pub use export::write_status_csv;
pub use repository::{
    ApplicationRecord, ApplicationRepository, ApplicationStatusView, RepositoryError,
};
pub use router::application_router;
pub use service::{KycApplicationService, KycServiceError, WorkflowPolicy};
pub use storage::{InMemoryApplicationRepository, JsonFileRepository};
