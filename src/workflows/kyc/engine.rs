use chrono::{DateTime, Utc};
use tracing::debug;

use super::contracts::{
    BiometricAnalysis, DocumentAnalysis, Normalized, RiskAnalysis, RiskDecision, SelfieStatus,
};
use super::domain::{
    ApplicationStatus, DocumentEntry, DocumentSlot, DocumentSlots, DocumentStatus, DocumentType,
    SelfieEntry,
};
use super::fusion::fuse;
use super::repository::ApplicationRecord;

pub const ALL_DOCUMENTS_PROCESSED: &str =
    "All documents processed. Please proceed to liveness check.";
pub const ID_DOCUMENT_PROCESSED: &str = "ID document processed. Please upload proof of address.";
pub const ADDRESS_PROOF_PROCESSED: &str =
    "Proof of address processed. Please upload an ID document.";
pub const DEFAULT_REJECTION_REASON: &str = "See document forensics.";
pub const INCOMPLETE_ANALYSIS: &str = "Analysis data incomplete; missing fields were defaulted.";
pub const BIOMETRIC_SUCCESS: [&str; 4] = [
    "ID document processed.",
    "Address proof processed.",
    "Biometric verification successful.",
    "Proceeding to final risk analysis.",
];

/// A document headed for one of the two slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub slot: DocumentSlot,
    pub document_type: DocumentType,
    pub storage_reference: String,
}

impl DocumentUpload {
    /// Upload routed to the slot its document type belongs to.
    pub fn new(document_type: DocumentType, storage_reference: impl Into<String>) -> Self {
        Self {
            slot: document_type.slot(),
            document_type,
            storage_reference: storage_reference.into(),
        }
    }
}

/// The verification state machine.
///
/// Every operation takes the current record and returns the next one. Operations do no I/O
/// and never fail; callers check [`ApplicationStatus::accepts`] before applying an event.
/// A record in a terminal status is returned untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowEngine;

impl WorkflowEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply_document_result(
        &self,
        mut record: ApplicationRecord,
        upload: DocumentUpload,
        analysis: &Normalized<DocumentAnalysis>,
        now: DateTime<Utc>,
    ) -> ApplicationRecord {
        if record.is_terminal() {
            debug!(application_id = %record.application_id, status = %record.status, "ignoring document result for terminal application");
            return record;
        }

        let DocumentAnalysis {
            extracted_data,
            forensics,
            model_info,
        } = analysis.analysis.clone();
        let derived_status = DocumentStatus::from_forensics(forensics.status);
        let rejection_reason = forensics
            .reason
            .clone()
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

        record.documents.set(
            upload.slot,
            DocumentEntry {
                storage_reference: upload.storage_reference,
                uploaded_at: now,
                document_type: upload.document_type,
                processing_outcome: forensics.status,
                forensics,
                extracted_fields: extracted_data,
                model_info,
                derived_status,
            },
        );
        record.identity_data = fuse(&record.identity_data, &record.documents);

        if derived_status.is_processed() {
            let (status, explanation) = pending_after_documents(&record.documents);
            record.status = status;
            if let Some(explanation) = explanation {
                record.replace_explanations([explanation]);
            }
        } else {
            record.status = ApplicationStatus::rejected_slot(upload.slot);
            record.explain_once(format!(
                "{} was rejected. Reason: {}",
                upload.slot.key(),
                rejection_reason
            ));
        }

        finish(record, analysis, now)
    }

    pub fn apply_selfie_result(
        &self,
        mut record: ApplicationRecord,
        storage_reference: impl Into<String>,
        analysis: &Normalized<BiometricAnalysis>,
        now: DateTime<Utc>,
    ) -> ApplicationRecord {
        if record.is_terminal() {
            debug!(application_id = %record.application_id, status = %record.status, "ignoring selfie result for terminal application");
            return record;
        }

        let biometric = analysis.analysis.clone();
        let outcome = biometric.status;
        let reason = biometric.reason.clone();
        record.selfie = Some(SelfieEntry {
            storage_reference: storage_reference.into(),
            uploaded_at: now,
            outcome_status: outcome,
            analysis: biometric,
        });

        // The document-phase guidance no longer applies once the biometric step has run.
        record.explanations.clear();
        record.explain_once(reason);

        record.status = match outcome {
            SelfieStatus::Clear => {
                record.replace_explanations(BIOMETRIC_SUCCESS);
                ApplicationStatus::PendingRiskAnalysis
            }
            SelfieStatus::RejectedLiveness => ApplicationStatus::RejectedLiveness,
            SelfieStatus::RejectedMismatch => ApplicationStatus::RejectedMismatch,
        };

        finish(record, analysis, now)
    }

    pub fn apply_risk_result(
        &self,
        mut record: ApplicationRecord,
        analysis: &Normalized<RiskAnalysis>,
        now: DateTime<Utc>,
    ) -> ApplicationRecord {
        if record.is_terminal() {
            debug!(application_id = %record.application_id, status = %record.status, "ignoring risk result for terminal application");
            return record;
        }

        let risk = analysis.analysis.clone();
        record.status = match risk.decision {
            RiskDecision::Approved => ApplicationStatus::Approved,
            RiskDecision::Rejected => ApplicationStatus::Rejected,
            RiskDecision::ManualReview => ApplicationStatus::ManualReview,
        };
        record.risk_score = Some(risk.risk_score);
        record.replace_explanations(risk.xai_explanations.iter().cloned());
        record.risk_analysis = Some(risk);

        finish(record, analysis, now)
    }

    /// Lift a slot rejection so a fresh upload to that slot can be applied.
    ///
    /// Only `REJECTED_<SLOT>` for the given slot is reopened; the pending status is recomputed
    /// from the slots and explanations are left as they are.
    pub fn reopen_slot(
        &self,
        mut record: ApplicationRecord,
        slot: DocumentSlot,
        now: DateTime<Utc>,
    ) -> ApplicationRecord {
        if record.status != ApplicationStatus::rejected_slot(slot) {
            return record;
        }

        record.status = pending_after_documents(&record.documents).0;
        record.updated_at = now;
        record
    }
}

/// Pending status implied by the processed slots, with the guidance to show for it.
fn pending_after_documents(documents: &DocumentSlots) -> (ApplicationStatus, Option<&'static str>) {
    let id_ok = documents.is_processed(DocumentSlot::IdDocument);
    let address_ok = documents.is_processed(DocumentSlot::AddressProof);

    match (id_ok, address_ok) {
        (true, true) => (
            ApplicationStatus::PendingSelfie,
            Some(ALL_DOCUMENTS_PROCESSED),
        ),
        (true, false) => (
            ApplicationStatus::PendingAddressProof,
            Some(ID_DOCUMENT_PROCESSED),
        ),
        (false, true) => (
            ApplicationStatus::PendingIdDocument,
            Some(ADDRESS_PROOF_PROCESSED),
        ),
        (false, false) => (ApplicationStatus::PendingDocuments, None),
    }
}

fn finish<T>(
    mut record: ApplicationRecord,
    analysis: &Normalized<T>,
    now: DateTime<Utc>,
) -> ApplicationRecord {
    if !analysis.is_complete() {
        record.explain_once(INCOMPLETE_ANALYSIS);
    }
    record.updated_at = now;
    record
}
