use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::contracts::{
    BiometricAnalysisPayload, DocumentAnalysisPayload, MalformedAnalysisResult, Normalized,
    RiskAnalysisPayload,
};
use super::domain::{ApplicationId, ApplicationStatus, WorkflowEvent};
use super::engine::{DocumentUpload, WorkflowEngine};
use super::locks::RecordLocks;
use super::repository::{ApplicationRecord, ApplicationRepository, RepositoryError};
use crate::config::WorkflowConfig;

/// Policy decisions the engine leaves to the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// Accept a new upload into a slot whose previous document was rejected.
    pub allow_document_retry: bool,
}

impl WorkflowPolicy {
    /// Whether an application in `status` may take `event` under this policy.
    pub fn admits(self, status: ApplicationStatus, event: WorkflowEvent) -> bool {
        status.accepts(event)
            || matches!(
                event,
                WorkflowEvent::DocumentUpload(slot)
                    if self.allow_document_retry && status == ApplicationStatus::rejected_slot(slot)
            )
    }
}

impl From<&WorkflowConfig> for WorkflowPolicy {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            allow_document_retry: config.allow_document_retry,
        }
    }
}

/// Boundary around the workflow engine: precondition checks, per-application locking and
/// persistence.
pub struct KycApplicationService<R: ?Sized> {
    repository: Arc<R>,
    engine: WorkflowEngine,
    locks: RecordLocks,
    policy: WorkflowPolicy,
}

impl<R> KycApplicationService<R>
where
    R: ApplicationRepository + ?Sized + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_policy(repository, WorkflowPolicy::default())
    }

    pub fn with_policy(repository: Arc<R>, policy: WorkflowPolicy) -> Self {
        Self {
            repository,
            engine: WorkflowEngine::new(),
            locks: RecordLocks::new(),
            policy,
        }
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.policy
    }

    /// Start a new application in `PENDING_DOCUMENTS`.
    pub fn create_application(&self) -> Result<ApplicationRecord, KycServiceError> {
        let record = ApplicationRecord::new(ApplicationId::generate(), Utc::now());
        let stored = self.repository.insert(record)?;
        info!(application_id = %stored.application_id, "application created");
        Ok(stored)
    }

    pub fn get_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, KycServiceError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| KycServiceError::NotFound(application_id.clone()))
    }

    /// Oldest applications first.
    pub fn list_applications(
        &self,
        limit: usize,
    ) -> Result<Vec<ApplicationRecord>, KycServiceError> {
        Ok(self.repository.list(limit)?)
    }

    /// Record a document analysis and advance the workflow.
    pub fn submit_document(
        &self,
        application_id: &ApplicationId,
        upload: DocumentUpload,
        payload: DocumentAnalysisPayload,
    ) -> Result<ApplicationRecord, KycServiceError> {
        let analysis = payload.normalize();
        report_defect(application_id, &analysis);
        let slot = upload.slot;

        self.transition(
            application_id,
            WorkflowEvent::DocumentUpload(slot),
            |engine, mut record, now| {
                if self.policy.allow_document_retry
                    && record.status == ApplicationStatus::rejected_slot(slot)
                {
                    info!(%application_id, slot = slot.key(), "reopening rejected document slot");
                    record = engine.reopen_slot(record, slot, now);
                }
                record
            },
            |engine, record, now| engine.apply_document_result(record, upload, &analysis, now),
        )
    }

    /// Record the biometric analysis of a selfie.
    pub fn submit_selfie(
        &self,
        application_id: &ApplicationId,
        storage_reference: impl Into<String>,
        payload: BiometricAnalysisPayload,
    ) -> Result<ApplicationRecord, KycServiceError> {
        let analysis = payload.normalize();
        report_defect(application_id, &analysis);
        let storage_reference = storage_reference.into();

        self.transition(
            application_id,
            WorkflowEvent::SelfieUpload,
            |_, record, _| record,
            |engine, record, now| {
                engine.apply_selfie_result(record, storage_reference, &analysis, now)
            },
        )
    }

    /// Record the final risk decision.
    pub fn submit_risk_analysis(
        &self,
        application_id: &ApplicationId,
        payload: RiskAnalysisPayload,
    ) -> Result<ApplicationRecord, KycServiceError> {
        let analysis = payload.normalize();
        report_defect(application_id, &analysis);

        self.transition(
            application_id,
            WorkflowEvent::RiskAnalysis,
            |_, record, _| record,
            |engine, record, now| engine.apply_risk_result(record, &analysis, now),
        )
    }

    /// Locked fetch, precondition check, engine step, write back.
    ///
    /// `prepare` may adjust the record before the check (document retry); nothing is written
    /// unless `apply` runs and the store accepts the update.
    fn transition<P, A>(
        &self,
        application_id: &ApplicationId,
        event: WorkflowEvent,
        prepare: P,
        apply: A,
    ) -> Result<ApplicationRecord, KycServiceError>
    where
        P: FnOnce(&WorkflowEngine, ApplicationRecord, DateTime<Utc>) -> ApplicationRecord,
        A: FnOnce(&WorkflowEngine, ApplicationRecord, DateTime<Utc>) -> ApplicationRecord,
    {
        self.locks.with_lock(application_id, || -> Result<ApplicationRecord, KycServiceError> {
            let record = self
                .repository
                .fetch(application_id)?
                .ok_or_else(|| KycServiceError::NotFound(application_id.clone()))?;

            let now = Utc::now();
            let record = prepare(&self.engine, record, now);
            let previous = record.status;
            if !previous.accepts(event) {
                return Err(KycServiceError::InvalidState {
                    status: previous,
                    event,
                });
            }

            let updated = apply(&self.engine, record, now);
            self.repository.update(updated.clone())?;

            info!(
                %application_id,
                %event,
                from = %previous,
                to = %updated.status,
                "application transitioned"
            );
            Ok(updated)
        })
    }
}

fn report_defect<T>(application_id: &ApplicationId, analysis: &Normalized<T>) {
    if let Some(MalformedAnalysisResult { kind, missing }) = &analysis.defect {
        warn!(
            %application_id,
            analysis = %kind,
            missing = ?missing,
            "analyzer returned incomplete data; defaults applied"
        );
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum KycServiceError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("cannot accept {event}: application status is '{status}'")]
    InvalidState {
        status: ApplicationStatus,
        event: WorkflowEvent,
    },
    #[error(transparent)]
    Store(#[from] RepositoryError),
}
