//! CSV export of a job's applicants.

use pyjobs_models::Applicant;

use crate::error::{ApiError, ApiResult};

/// Column order of the applicant export.
pub const APPLICANT_CSV_HEADER: [&str; 9] = [
    "first_name",
    "last_name",
    "email",
    "github",
    "linkedin",
    "portfolio",
    "cellphone",
    "applied_at",
    "challenge_response_link",
];

/// Serialize applicants as RFC 4180 CSV, header first.
pub fn applicants_csv(applicants: &[Applicant]) -> ApiResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(APPLICANT_CSV_HEADER).map_err(csv_error)?;

    for applicant in applicants {
        let applied_at = applicant.applied_at.to_rfc3339();
        writer
            .write_record([
                applicant.first_name.as_str(),
                applicant.last_name.as_str(),
                applicant.email.as_str(),
                applicant.github.as_deref().unwrap_or(""),
                applicant.linkedin.as_deref().unwrap_or(""),
                applicant.portfolio.as_deref().unwrap_or(""),
                applicant.cellphone.as_deref().unwrap_or(""),
                applied_at.as_str(),
                applicant.challenge_response_link.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::internal(format!("Failed to finish CSV export: {}", e)))
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::internal(format!("Failed to write CSV export: {}", err))
}
