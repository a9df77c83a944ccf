use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contracts::{BiometricAnalysis, DocumentForensics, ForensicsStatus, SelfieStatus};

/// Identifier wrapper for KYC applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fused identity view keyed by field name. Absent keys are not yet known.
pub type IdentityData = BTreeMap<String, String>;

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    PendingDocuments,
    PendingIdDocument,
    PendingAddressProof,
    PendingSelfie,
    PendingRiskAnalysis,
    RejectedIdDocument,
    RejectedAddressProof,
    RejectedLiveness,
    RejectedMismatch,
    Approved,
    Rejected,
    ManualReview,
}

impl ApplicationStatus {
    pub const fn all() -> [Self; 12] {
        [
            Self::PendingDocuments,
            Self::PendingIdDocument,
            Self::PendingAddressProof,
            Self::PendingSelfie,
            Self::PendingRiskAnalysis,
            Self::RejectedIdDocument,
            Self::RejectedAddressProof,
            Self::RejectedLiveness,
            Self::RejectedMismatch,
            Self::Approved,
            Self::Rejected,
            Self::ManualReview,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingDocuments => "PENDING_DOCUMENTS",
            Self::PendingIdDocument => "PENDING_ID_DOCUMENT",
            Self::PendingAddressProof => "PENDING_ADDRESS_PROOF",
            Self::PendingSelfie => "PENDING_SELFIE",
            Self::PendingRiskAnalysis => "PENDING_RISK_ANALYSIS",
            Self::RejectedIdDocument => "REJECTED_ID_DOCUMENT",
            Self::RejectedAddressProof => "REJECTED_ADDRESS_PROOF",
            Self::RejectedLiveness => "REJECTED_LIVENESS",
            Self::RejectedMismatch => "REJECTED_MISMATCH",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::ManualReview => "MANUAL_REVIEW",
        }
    }

    /// No engine transition leaves a terminal status.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::RejectedIdDocument
                | Self::RejectedAddressProof
                | Self::RejectedLiveness
                | Self::RejectedMismatch
                | Self::Approved
                | Self::Rejected
                | Self::ManualReview
        )
    }

    /// Whether the workflow takes `event` while in this status.
    pub const fn accepts(self, event: WorkflowEvent) -> bool {
        match event {
            WorkflowEvent::DocumentUpload(_) => matches!(
                self,
                Self::PendingDocuments
                    | Self::PendingIdDocument
                    | Self::PendingAddressProof
                    | Self::PendingSelfie
            ),
            WorkflowEvent::SelfieUpload => matches!(self, Self::PendingSelfie),
            WorkflowEvent::RiskAnalysis => matches!(self, Self::PendingRiskAnalysis),
        }
    }

    pub const fn rejected_slot(slot: DocumentSlot) -> Self {
        match slot {
            DocumentSlot::IdDocument => Self::RejectedIdDocument,
            DocumentSlot::AddressProof => Self::RejectedAddressProof,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    DocumentUpload(DocumentSlot),
    SelfieUpload,
    RiskAnalysis,
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowEvent::DocumentUpload(slot) => write!(f, "{} upload", slot.key()),
            WorkflowEvent::SelfieUpload => f.write_str("selfie upload"),
            WorkflowEvent::RiskAnalysis => f.write_str("risk analysis"),
        }
    }
}

/// The two fixed document roles on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSlot {
    IdDocument,
    AddressProof,
}

impl DocumentSlot {
    pub const fn key(self) -> &'static str {
        match self {
            DocumentSlot::IdDocument => "id_document",
            DocumentSlot::AddressProof => "address_proof",
        }
    }
}

/// Document kinds accepted at the upload boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Passport,
    DriverLicense,
    /// Synthetic identity document that always fails forensics.
    TamperedExample,
    UtilityBill,
}

impl DocumentType {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::Passport => "PASSPORT",
            DocumentType::DriverLicense => "DRIVER_LICENSE",
            DocumentType::TamperedExample => "TAMPERED_EXAMPLE",
            DocumentType::UtilityBill => "UTILITY_BILL",
        }
    }

    pub const fn slot(self) -> DocumentSlot {
        match self {
            DocumentType::Passport | DocumentType::DriverLicense | DocumentType::TamperedExample => {
                DocumentSlot::IdDocument
            }
            DocumentType::UtilityBill => DocumentSlot::AddressProof,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid document type '{0}'")]
pub struct UnsupportedDocumentType(pub String);

impl FromStr for DocumentType {
    type Err = UnsupportedDocumentType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "PASSPORT" => Ok(Self::Passport),
            "DRIVER_LICENSE" => Ok(Self::DriverLicense),
            "TAMPERED_EXAMPLE" => Ok(Self::TamperedExample),
            "UTILITY_BILL" => Ok(Self::UtilityBill),
            other => Err(UnsupportedDocumentType(other.to_string())),
        }
    }
}

/// Outcome of processing one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Processed,
    RejectedTampered,
    RejectedBlurry,
    RejectedUnsupportedDocument,
}

impl DocumentStatus {
    pub const fn from_forensics(status: ForensicsStatus) -> Self {
        match status {
            ForensicsStatus::Clear => Self::Processed,
            ForensicsStatus::Tampered => Self::RejectedTampered,
            ForensicsStatus::Blurry => Self::RejectedBlurry,
            ForensicsStatus::UnsupportedDocument => Self::RejectedUnsupportedDocument,
        }
    }

    pub const fn is_processed(self) -> bool {
        matches!(self, Self::Processed)
    }
}

/// Stored result of one document upload. Replaced wholesale on re-upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub storage_reference: String,
    pub uploaded_at: DateTime<Utc>,
    pub document_type: DocumentType,
    pub processing_outcome: ForensicsStatus,
    pub forensics: DocumentForensics,
    pub extracted_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub model_info: serde_json::Map<String, serde_json::Value>,
    pub derived_status: DocumentStatus,
}

impl DocumentEntry {
    pub fn is_processed(&self) -> bool {
        self.derived_status.is_processed()
    }
}

/// The two document slots of an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSlots {
    pub id_document: Option<DocumentEntry>,
    pub address_proof: Option<DocumentEntry>,
}

impl DocumentSlots {
    pub fn get(&self, slot: DocumentSlot) -> Option<&DocumentEntry> {
        match slot {
            DocumentSlot::IdDocument => self.id_document.as_ref(),
            DocumentSlot::AddressProof => self.address_proof.as_ref(),
        }
    }

    pub fn set(&mut self, slot: DocumentSlot, entry: DocumentEntry) {
        match slot {
            DocumentSlot::IdDocument => self.id_document = Some(entry),
            DocumentSlot::AddressProof => self.address_proof = Some(entry),
        }
    }

    pub fn is_processed(&self, slot: DocumentSlot) -> bool {
        self.get(slot).is_some_and(DocumentEntry::is_processed)
    }
}

/// Stored result of the biometric step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfieEntry {
    pub storage_reference: String,
    pub uploaded_at: DateTime<Utc>,
    pub outcome_status: SelfieStatus,
    pub analysis: BiometricAnalysis,
}
