use std::io::Write;

use serde::Serialize;

use super::repository::ApplicationRecord;

/// One line of the application status export.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    application_id: &'a str,
    status: &'static str,
    created_at: String,
    updated_at: String,
    risk_score: Option<i64>,
    explanation_count: usize,
    explanations: String,
}

impl<'a> From<&'a ApplicationRecord> for ExportRow<'a> {
    fn from(record: &'a ApplicationRecord) -> Self {
        Self {
            application_id: record.application_id.as_str(),
            status: record.status.label(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
            risk_score: record.risk_score,
            explanation_count: record.explanations.len(),
            explanations: record.explanations.join(" | "),
        }
    }
}

/// Write a CSV status report, one row per application, header included.
pub fn write_status_csv<'a, W, I>(writer: W, records: I) -> Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = &'a ApplicationRecord>,
{
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(ExportRow::from(record))?;
    }
    csv.flush()?;
    Ok(())
}
