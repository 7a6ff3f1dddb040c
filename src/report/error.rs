//! Report pipeline errors

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Patient identifier is required")]
    MissingIdentifier,

    #[error("Output path must stay inside the output directory: {0}")]
    InvalidOutputPath(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Missing required patient data: {field}")]
    MissingPatientData { field: &'static str },

    #[error("Malformed record field {field}: {reason}")]
    Composition { field: String, reason: String },

    #[error("Chart could not be placed: {0}")]
    ImagePlacement(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ReportError {
    /// HTTP-equivalent status for callers that speak in status codes
    pub fn status_code(&self) -> u16 {
        match self {
            ReportError::MissingIdentifier | ReportError::InvalidOutputPath(_) => 400,
            ReportError::PatientNotFound(_) => 404,
            _ => 500,
        }
    }

    pub fn composition(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ReportError::Composition {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<DbError> for ReportError {
    fn from(e: DbError) -> Self {
        ReportError::UpstreamFetch(e.to_string())
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(e: reqwest::Error) -> Self {
        ReportError::UpstreamFetch(e.to_string())
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ReportError::MissingIdentifier.status_code(), 400);
        assert_eq!(ReportError::InvalidOutputPath("/tmp/x.pdf".into()).status_code(), 400);
        assert_eq!(ReportError::PatientNotFound("P-1".into()).status_code(), 404);
        assert_eq!(
            ReportError::MissingPatientData { field: "name" }.status_code(),
            500
        );
        assert_eq!(ReportError::UpstreamFetch("503".into()).status_code(), 500);
    }

    #[test]
    fn test_composition_error_names_field() {
        let e = ReportError::composition("discharge.relapse_risk", "out of range");
        assert_eq!(
            e.to_string(),
            "Malformed record field discharge.relapse_risk: out of range"
        );
    }
}
