use clap::Args;
use smart_kyc::error::AppError;
use smart_kyc::workflows::kyc::{
    ApplicationRecord, ApplicationStatus, BiometricAnalyzer, DocumentAnalyzer, DocumentType,
    DocumentUpload, InMemoryApplicationRepository, KycApplicationService, KycServiceError,
    RiskAnalyzer, SimulatedAnalyzers,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Submit a selfie the liveness check flags as a spoof.
    #[arg(long)]
    pub(crate) spoof_selfie: bool,
    /// Submit a tampered identity document instead of a passport.
    #[arg(long)]
    pub(crate) tampered_id: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Identity verification demo (simulated analyzers)");
    let record = drive_application(&args)?;

    println!("\nFinal status: {}", record.status);
    if let Some(score) = record.risk_score {
        println!("Risk score: {score}");
    }
    match serde_json::to_string_pretty(&record.status_view()) {
        Ok(json) => println!("Public status payload:\n{json}"),
        Err(err) => println!("Public status payload unavailable: {err}"),
    }
    Ok(())
}

/// Run one application as far as the workflow allows and return its last stored state.
pub(crate) fn drive_application(args: &DemoArgs) -> Result<ApplicationRecord, AppError> {
    let analyzers = SimulatedAnalyzers;
    let service = KycApplicationService::new(Arc::new(InMemoryApplicationRepository::default()));

    let record = service.create_application()?;
    let id = record.application_id.clone();
    println!("- Started application {id} -> {}", record.status);

    let identity_document = if args.tampered_id {
        (DocumentType::TamperedExample, "tampered_id.png")
    } else {
        (DocumentType::Passport, "passport.jpg")
    };
    let documents = [identity_document, (DocumentType::UtilityBill, "utility_bill.pdf")];

    for (document_type, file_name) in documents {
        let payload = analyzers.analyze_document(document_type, file_name);
        let upload = DocumentUpload::new(document_type, format!("uploads/{id}/{file_name}"));
        match service.submit_document(&id, upload, payload) {
            Ok(record) => print_step(&format!("{document_type} upload"), &record),
            Err(KycServiceError::InvalidState { status, .. }) => {
                println!("- {document_type} upload skipped: application is {status}");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let current = service.get_application(&id)?;
    if current.status != ApplicationStatus::PendingSelfie {
        return Ok(current);
    }

    let selfie = if args.spoof_selfie {
        "spoof_attempt.jpg"
    } else {
        "selfie.jpg"
    };
    let payload = analyzers.analyze_selfie(&id, selfie, false);
    let record = service.submit_selfie(&id, format!("uploads/{id}/{selfie}"), payload)?;
    print_step("Selfie", &record);

    if record.status != ApplicationStatus::PendingRiskAnalysis {
        return Ok(record);
    }

    let payload = analyzers.analyze_risk(&record);
    let record = service.submit_risk_analysis(&id, payload)?;
    print_step("Risk analysis", &record);
    Ok(record)
}

fn print_step(step: &str, record: &ApplicationRecord) {
    println!("- {step} -> {}", record.status);
    for explanation in &record.explanations {
        println!("    {explanation}");
    }
}
