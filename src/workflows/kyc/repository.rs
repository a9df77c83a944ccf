use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contracts::RiskAnalysis;
use super::domain::{ApplicationId, ApplicationStatus, DocumentSlots, IdentityData, SelfieEntry};

/// One applicant's journey through the verification workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub documents: DocumentSlots,
    pub selfie: Option<SelfieEntry>,
    pub identity_data: IdentityData,
    pub risk_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_analysis: Option<RiskAnalysis>,
    pub explanations: Vec<String>,
}

impl ApplicationRecord {
    /// Fresh application awaiting documents.
    pub fn new(application_id: ApplicationId, now: DateTime<Utc>) -> Self {
        Self {
            application_id,
            status: ApplicationStatus::PendingDocuments,
            created_at: now,
            updated_at: now,
            documents: DocumentSlots::default(),
            selfie: None,
            identity_data: IdentityData::new(),
            risk_score: None,
            risk_analysis: None,
            explanations: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append an explanation unless the exact string is already listed.
    pub fn explain_once(&mut self, explanation: impl Into<String>) {
        let explanation = explanation.into();
        if !self.explanations.contains(&explanation) {
            self.explanations.push(explanation);
        }
    }

    pub fn replace_explanations<I, S>(&mut self, explanations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explanations = explanations.into_iter().map(Into::into).collect();
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            explanations: self.explanations.clone(),
            risk_score: self.risk_score,
            updated_at: self.updated_at,
        }
    }
}

/// Storage abstraction the workflow service reads from and writes to.
///
/// Implementations must make `fetch` and `update` atomic per record; the service holds the
/// per-application lock across the read-modify-write.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn list(&self, limit: usize) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Compact status summary for listings and logs.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub explanations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<i64>,
    pub updated_at: DateTime<Utc>,
}
