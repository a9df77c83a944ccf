//! Result contracts produced by the external analyzers.
//!
//! Each contract comes in two shapes. The `*Payload` types mirror the wire format with every
//! field optional, so a partial analyzer response still deserializes. `normalize` turns a
//! payload into the strict contract the workflow engine consumes, filling documented defaults
//! and reporting what was missing as a [`MalformedAnalysisResult`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form model metadata attached to every analyzer response.
pub type ModelInfo = Map<String, Value>;

/// Reason recorded when a biometric response carries none.
pub const DEFAULT_SELFIE_REASON: &str = "Selfie processed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForensicsStatus {
    Clear,
    Tampered,
    Blurry,
    UnsupportedDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentForensics {
    pub status: ForensicsStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks_passed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks_failed: Vec<String>,
}

/// Document forensics/OCR result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub extracted_data: BTreeMap<String, String>,
    pub forensics: DocumentForensics,
    pub model_info: ModelInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelfieStatus {
    Clear,
    RejectedLiveness,
    RejectedMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LivenessStatus {
    Real,
    Fake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessCheck {
    pub status: LivenessStatus,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceMatchStatus {
    Match,
    Mismatch,
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub status: FaceMatchStatus,
    pub match_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_document_face_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selfie_face_ref: Option<String>,
}

impl FaceMatch {
    fn not_attempted() -> Self {
        Self {
            status: FaceMatchStatus::NotAttempted,
            match_score: 0.0,
            id_document_face_ref: None,
            selfie_face_ref: None,
        }
    }
}

/// Biometric liveness and face-match result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricAnalysis {
    pub status: SelfieStatus,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_check: Option<LivenessCheck>,
    pub face_match: FaceMatch,
    pub model_info: ModelInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskDecision {
    Approved,
    Rejected,
    ManualReview,
}

/// Final risk scoring result. `risk_score` is kept exactly as the analyzer sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub decision: RiskDecision,
    pub risk_score: i64,
    pub xai_explanations: Vec<String>,
    pub model_info: ModelInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Document,
    Biometric,
    Risk,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::Document => f.write_str("document"),
            AnalysisKind::Biometric => f.write_str("biometric"),
            AnalysisKind::Risk => f.write_str("risk"),
        }
    }
}

/// Fields an analyzer response was expected to carry but did not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} analysis result is missing {}", .missing.join(", "))]
pub struct MalformedAnalysisResult {
    pub kind: AnalysisKind,
    pub missing: Vec<&'static str>,
}

/// A strict contract plus the record of any defaults applied to build it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub analysis: T,
    pub defect: Option<MalformedAnalysisResult>,
}

impl<T> Normalized<T> {
    pub fn complete(analysis: T) -> Self {
        Self {
            analysis,
            defect: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.defect.is_none()
    }

    fn collect(kind: AnalysisKind, analysis: T, missing: Vec<&'static str>) -> Self {
        let defect = if missing.is_empty() {
            None
        } else {
            Some(MalformedAnalysisResult { kind, missing })
        };
        Self { analysis, defect }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForensicsPayload {
    #[serde(default)]
    pub status: Option<ForensicsStatus>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub checks_passed: Vec<String>,
    #[serde(default)]
    pub checks_failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysisPayload {
    #[serde(default)]
    pub extracted_data: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub forensics: Option<ForensicsPayload>,
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
}

impl DocumentAnalysisPayload {
    /// Missing forensics never count as clear: the status defaults to `UNSUPPORTED_DOCUMENT`.
    pub fn normalize(self) -> Normalized<DocumentAnalysis> {
        let mut missing = Vec::new();

        let extracted_data = self.extracted_data.unwrap_or_else(|| {
            missing.push("extracted_data");
            BTreeMap::new()
        });

        let forensics = self.forensics.unwrap_or_else(|| {
            missing.push("forensics");
            ForensicsPayload::default()
        });
        let status = match forensics.status {
            Some(status) => status,
            None => {
                if !missing.contains(&"forensics") {
                    missing.push("forensics.status");
                }
                ForensicsStatus::UnsupportedDocument
            }
        };

        let model_info = self.model_info.unwrap_or_else(|| {
            missing.push("model_info");
            ModelInfo::new()
        });

        let analysis = DocumentAnalysis {
            extracted_data,
            forensics: DocumentForensics {
                status,
                confidence_score: forensics.confidence_score,
                reason: forensics.reason,
                checks_passed: forensics.checks_passed,
                checks_failed: forensics.checks_failed,
            },
            model_info,
        };
        Normalized::collect(AnalysisKind::Document, analysis, missing)
    }
}

impl From<DocumentAnalysis> for DocumentAnalysisPayload {
    fn from(value: DocumentAnalysis) -> Self {
        Self {
            extracted_data: Some(value.extracted_data),
            forensics: Some(ForensicsPayload {
                status: Some(value.forensics.status),
                confidence_score: value.forensics.confidence_score,
                reason: value.forensics.reason,
                checks_passed: value.forensics.checks_passed,
                checks_failed: value.forensics.checks_failed,
            }),
            model_info: Some(value.model_info),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceMatchPayload {
    #[serde(default)]
    pub status: Option<FaceMatchStatus>,
    #[serde(default)]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub id_document_face_ref: Option<String>,
    #[serde(default)]
    pub selfie_face_ref: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiometricAnalysisPayload {
    #[serde(default)]
    pub status: Option<SelfieStatus>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub liveness_check: Option<LivenessCheck>,
    #[serde(default)]
    pub face_match: Option<FaceMatchPayload>,
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
}

impl BiometricAnalysisPayload {
    /// A response without a status is treated as a failed liveness check.
    pub fn normalize(self) -> Normalized<BiometricAnalysis> {
        let mut missing = Vec::new();

        let status = self.status.unwrap_or_else(|| {
            missing.push("status");
            SelfieStatus::RejectedLiveness
        });
        let reason = self.reason.unwrap_or_else(|| {
            missing.push("reason");
            DEFAULT_SELFIE_REASON.to_string()
        });
        if self.liveness_check.is_none() {
            missing.push("liveness_check");
        }

        let face_match = match self.face_match {
            Some(payload) => {
                let mut face_match = FaceMatch::not_attempted();
                match payload.match_score {
                    Some(score) => face_match.match_score = score,
                    None => missing.push("face_match.match_score"),
                }
                if let Some(status) = payload.status {
                    face_match.status = status;
                }
                face_match.id_document_face_ref = payload.id_document_face_ref;
                face_match.selfie_face_ref = payload.selfie_face_ref;
                face_match
            }
            None => {
                missing.push("face_match");
                FaceMatch::not_attempted()
            }
        };

        let model_info = self.model_info.unwrap_or_else(|| {
            missing.push("model_info");
            ModelInfo::new()
        });

        let analysis = BiometricAnalysis {
            status,
            reason,
            liveness_check: self.liveness_check,
            face_match,
            model_info,
        };
        Normalized::collect(AnalysisKind::Biometric, analysis, missing)
    }
}

impl From<BiometricAnalysis> for BiometricAnalysisPayload {
    fn from(value: BiometricAnalysis) -> Self {
        Self {
            status: Some(value.status),
            reason: Some(value.reason),
            liveness_check: value.liveness_check,
            face_match: Some(FaceMatchPayload {
                status: Some(value.face_match.status),
                match_score: Some(value.face_match.match_score),
                id_document_face_ref: value.face_match.id_document_face_ref,
                selfie_face_ref: value.face_match.selfie_face_ref,
            }),
            model_info: Some(value.model_info),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysisPayload {
    #[serde(default)]
    pub decision: Option<RiskDecision>,
    #[serde(default)]
    pub risk_score: Option<i64>,
    #[serde(default)]
    pub xai_explanations: Option<Vec<String>>,
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl RiskAnalysisPayload {
    /// Without a decision the application goes to manual review with a zero score.
    pub fn normalize(self) -> Normalized<RiskAnalysis> {
        let mut missing = Vec::new();

        let decision = self.decision.unwrap_or_else(|| {
            missing.push("decision");
            RiskDecision::ManualReview
        });
        let risk_score = self.risk_score.unwrap_or_else(|| {
            missing.push("risk_score");
            0
        });
        let xai_explanations = self.xai_explanations.unwrap_or_else(|| {
            missing.push("xai_explanations");
            Vec::new()
        });
        let model_info = self.model_info.unwrap_or_else(|| {
            missing.push("model_info");
            ModelInfo::new()
        });

        let analysis = RiskAnalysis {
            decision,
            risk_score,
            xai_explanations,
            model_info,
            analyzed_at: self.analyzed_at,
        };
        Normalized::collect(AnalysisKind::Risk, analysis, missing)
    }
}

impl From<RiskAnalysis> for RiskAnalysisPayload {
    fn from(value: RiskAnalysis) -> Self {
        Self {
            decision: Some(value.decision),
            risk_score: Some(value.risk_score),
            xai_explanations: Some(value.xai_explanations),
            model_info: Some(value.model_info),
            analyzed_at: value.analyzed_at,
        }
    }
}
