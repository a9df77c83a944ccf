//! Analyzer seams and a deterministic stand-in for the forensic, biometric and risk models.
//!
//! The workflow engine only ever sees the contracts these produce. `SimulatedAnalyzers` keeps
//! the demo and HTTP surface self-contained: outcomes depend only on the document type, the
//! selfie file name and the application record.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

use super::contracts::{
    BiometricAnalysis, BiometricAnalysisPayload, DocumentAnalysis, DocumentAnalysisPayload,
    DocumentForensics, FaceMatch, FaceMatchStatus, ForensicsStatus, LivenessCheck, LivenessStatus,
    ModelInfo, RiskAnalysis, RiskAnalysisPayload, RiskDecision, SelfieStatus,
};
use super::domain::{ApplicationId, DocumentType};
use super::repository::ApplicationRecord;

/// Scores below this are approved outright.
pub const APPROVAL_CEILING: i64 = 20;
/// Scores at or above this are rejected.
pub const REJECTION_FLOOR: i64 = 70;
/// Face-match scores under this add risk.
pub const MATCH_THRESHOLD: f64 = 0.9;
/// Score given to an application with nothing flagged.
pub const CLEAN_APPLICATION_SCORE: i64 = 10;

pub trait DocumentAnalyzer: Send + Sync {
    fn analyze_document(&self, document_type: DocumentType, file_name: &str)
        -> DocumentAnalysisPayload;
}

pub trait BiometricAnalyzer: Send + Sync {
    fn analyze_selfie(
        &self,
        application_id: &ApplicationId,
        file_name: &str,
        trigger_fail: bool,
    ) -> BiometricAnalysisPayload;
}

pub trait RiskAnalyzer: Send + Sync {
    fn analyze_risk(&self, record: &ApplicationRecord) -> RiskAnalysisPayload;
}

/// Everything the HTTP surface needs to drive an application end to end.
pub trait AnalysisSuite: DocumentAnalyzer + BiometricAnalyzer + RiskAnalyzer {}

impl<T> AnalysisSuite for T where T: DocumentAnalyzer + BiometricAnalyzer + RiskAnalyzer {}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedAnalyzers;

fn model_info(entries: &[(&str, &str)]) -> ModelInfo {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), json!(value)))
        .collect()
}

fn fields(entries: &[(&str, String)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn clear_forensics(confidence: f64, checks: &[&str]) -> DocumentForensics {
    DocumentForensics {
        status: ForensicsStatus::Clear,
        confidence_score: Some(confidence),
        reason: None,
        checks_passed: checks.iter().map(|check| check.to_string()).collect(),
        checks_failed: Vec::new(),
    }
}

impl DocumentAnalyzer for SimulatedAnalyzers {
    fn analyze_document(
        &self,
        document_type: DocumentType,
        _file_name: &str,
    ) -> DocumentAnalysisPayload {
        let today = Utc::now().date_naive();
        let model_info = model_info(&[
            ("ocr_model", "sim-trocr-transformer-v1.2"),
            ("forensics_model", "sim-cnn-tamper-v2.1"),
        ]);

        let (extracted_data, forensics) = match document_type {
            DocumentType::Passport => (
                fields(&[
                    ("first_name", "JANE".to_string()),
                    ("last_name", "DOE".to_string()),
                    ("document_number", "P01234567".to_string()),
                    ("dob", "1990-01-01".to_string()),
                    ("expiry_date", iso_date(today + Duration::days(1825))),
                    ("nationality", "USA".to_string()),
                ]),
                clear_forensics(0.97, &["hologram_check", "font_analysis", "template_match"]),
            ),
            DocumentType::DriverLicense => (
                fields(&[
                    ("first_name", "JANE".to_string()),
                    ("last_name", "DOE".to_string()),
                    ("document_number", "D7654321".to_string()),
                    ("dob", "1990-01-01".to_string()),
                    ("expiry_date", iso_date(today + Duration::days(1460))),
                    ("address", "123 MAIN ST, ANYTOWN, USA 12345".to_string()),
                ]),
                clear_forensics(0.95, &["barcode_check", "font_analysis", "template_match"]),
            ),
            DocumentType::UtilityBill => (
                fields(&[
                    ("name", "JANE DOE".to_string()),
                    ("address", "123 MAIN ST, ANYTOWN, USA 12345".to_string()),
                    ("issue_date", iso_date(today - Duration::days(30))),
                    ("provider", "City Electric & Gas".to_string()),
                ]),
                clear_forensics(
                    0.95,
                    &["logo_match", "address_database_crosscheck", "date_check"],
                ),
            ),
            DocumentType::TamperedExample => (
                fields(&[
                    ("first_name", "J0HN".to_string()),
                    ("last_name", "SM1TH".to_string()),
                    ("document_number", "T80123456".to_string()),
                    ("dob", "1985-02-15".to_string()),
                    ("expiry_date", "2025-01-01".to_string()),
                    ("nationality", "UKN".to_string()),
                ]),
                DocumentForensics {
                    status: ForensicsStatus::Tampered,
                    confidence_score: Some(0.98),
                    reason: Some("Digital alteration detected in Date of Birth field.".to_string()),
                    checks_passed: Vec::new(),
                    checks_failed: vec!["pixel_analysis".to_string(), "font_analysis".to_string()],
                },
            ),
        };

        DocumentAnalysis {
            extracted_data,
            forensics,
            model_info,
        }
        .into()
    }
}

impl BiometricAnalyzer for SimulatedAnalyzers {
    fn analyze_selfie(
        &self,
        application_id: &ApplicationId,
        file_name: &str,
        trigger_fail: bool,
    ) -> BiometricAnalysisPayload {
        let (status, reason, liveness, face_status, match_score) = if trigger_fail {
            (
                SelfieStatus::RejectedMismatch,
                "Selfie does not match the photo on the ID document.",
                LivenessCheck {
                    status: LivenessStatus::Real,
                    confidence: 0.98,
                },
                FaceMatchStatus::Mismatch,
                0.45,
            )
        } else if file_name.to_lowercase().contains("spoof") {
            (
                SelfieStatus::RejectedLiveness,
                "Liveness check failed. Suspected spoof attempt.",
                LivenessCheck {
                    status: LivenessStatus::Fake,
                    confidence: 0.91,
                },
                FaceMatchStatus::NotAttempted,
                0.0,
            )
        } else {
            (
                SelfieStatus::Clear,
                "Biometric verification successful.",
                LivenessCheck {
                    status: LivenessStatus::Real,
                    confidence: 0.98,
                },
                FaceMatchStatus::Match,
                0.97,
            )
        };

        BiometricAnalysis {
            status,
            reason: reason.to_string(),
            liveness_check: Some(liveness),
            face_match: FaceMatch {
                status: face_status,
                match_score,
                id_document_face_ref: Some(format!("doc_{application_id}_face.jpg")),
                selfie_face_ref: Some(format!("selfie_{application_id}_face.jpg")),
            },
            model_info: model_info(&[
                ("face_match_model", "sim-cnn-facenet-v3.0"),
                ("liveness_model", "sim-antispoof-v1.8"),
            ]),
        }
        .into()
    }
}

impl RiskAnalyzer for SimulatedAnalyzers {
    fn analyze_risk(&self, record: &ApplicationRecord) -> RiskAnalysisPayload {
        let mut score = 0.0_f64;
        let mut explanations = Vec::new();

        // Forensics: both slots are expected to be populated by now.
        let mut forensics_missing = false;
        match &record.documents.id_document {
            Some(id_document) => {
                if id_document.forensics.status != ForensicsStatus::Clear {
                    score += 70.0;
                    explanations.push(format!(
                        "ID Document flagged for: {}.",
                        forensics_label(id_document.forensics.status)
                    ));
                }
                match &record.documents.address_proof {
                    Some(address_proof) => {
                        if address_proof.forensics.status != ForensicsStatus::Clear {
                            score += 40.0;
                            explanations.push(format!(
                                "Address Document flagged for: {}.",
                                forensics_label(address_proof.forensics.status)
                            ));
                        }
                    }
                    None => forensics_missing = true,
                }
            }
            None => forensics_missing = true,
        }
        if forensics_missing {
            score += 90.0;
            explanations.push("Critical error: Missing document forensics data.".to_string());
        }

        match &record.selfie {
            Some(selfie) => {
                let analysis = &selfie.analysis;
                if analysis.status != SelfieStatus::Clear {
                    score += 90.0;
                    explanations.push(format!(
                        "Biometric verification failed: {}.",
                        analysis.reason
                    ));
                }
                let match_score = analysis.face_match.match_score;
                if match_score < MATCH_THRESHOLD {
                    score += (1.0 - match_score) * 50.0;
                    explanations.push(format!("Low biometric match score ({match_score})."));
                }
            }
            None => {
                score += 90.0;
                explanations.push("Critical error: Missing biometric data.".to_string());
            }
        }

        let identity = &record.identity_data;
        let id_name = format!(
            "{} {}",
            identity.get("first_name").map(String::as_str).unwrap_or(""),
            identity.get("last_name").map(String::as_str).unwrap_or("")
        )
        .trim()
        .to_string();
        let address_name = identity.get("name").map(String::as_str).unwrap_or("");
        if !id_name.is_empty()
            && !address_name.is_empty()
            && id_name.to_lowercase() != address_name.to_lowercase()
        {
            score += 25.0;
            explanations.push(format!(
                "Name mismatch: ID says '{id_name}', Address proof says '{address_name}'."
            ));
        }

        let risk_score = if explanations.is_empty() {
            explanations.extend(
                [
                    "All automated checks passed.",
                    "Data consistent across documents.",
                    "Biometric match score is high.",
                ]
                .map(String::from),
            );
            CLEAN_APPLICATION_SCORE
        } else {
            (score as i64).clamp(0, 100)
        };

        RiskAnalysis {
            decision: decide(risk_score),
            risk_score,
            xai_explanations: explanations,
            model_info: model_info(&[
                ("risk_model", "sim-xgboost-classifier-v1.4"),
                ("xai_model", "sim-shap-explainer-v1.1"),
            ]),
            analyzed_at: Some(Utc::now()),
        }
        .into()
    }
}

/// Decision bands over a clamped risk score.
pub fn decide(risk_score: i64) -> RiskDecision {
    if risk_score < APPROVAL_CEILING {
        RiskDecision::Approved
    } else if risk_score >= REJECTION_FLOOR {
        RiskDecision::Rejected
    } else {
        RiskDecision::ManualReview
    }
}

fn forensics_label(status: ForensicsStatus) -> &'static str {
    match status {
        ForensicsStatus::Clear => "CLEAR",
        ForensicsStatus::Tampered => "TAMPERED",
        ForensicsStatus::Blurry => "BLURRY",
        ForensicsStatus::UnsupportedDocument => "UNSUPPORTED_DOCUMENT",
    }
}
