//! Clinical data sources
//!
//! The report pipeline reads one patient's records through [`ClinicalSource`].
//! Two implementations: the local SQLite database and an upstream REST API.

pub mod rest;
pub mod sqlite;

use serde::Serialize;

use crate::config::{ServiceConfig, SourceKind};
use crate::db::Database;
use crate::models::{
    ClinicalObservation, DischargeSummary, EvolutionNote, PatientRecord, TreatmentEntry,
};
use crate::report::ReportResult;

pub use rest::RestSource;
pub use sqlite::SqliteSource;

/// Everything known about one admission, in display order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientBundle {
    pub patient: PatientRecord,
    pub treatments: Vec<TreatmentEntry>,
    pub observations: Vec<ClinicalObservation>,
    pub notes: Vec<EvolutionNote>,
    pub discharge: Option<DischargeSummary>,
}

pub trait ClinicalSource: Send + Sync {
    /// Fetch a patient's records; `PatientNotFound` if the patient does not exist
    fn fetch_bundle(&self, patient_id: &str) -> ReportResult<PatientBundle>;

    /// Short name for logs and status output
    fn kind(&self) -> &'static str;
}

/// Build the configured source
pub fn from_config(config: &ServiceConfig) -> ReportResult<Box<dyn ClinicalSource>> {
    match &config.source {
        SourceKind::Sqlite => {
            if let Some(parent) = config.database_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let db = Database::open_migrated(&config.database_path)?;
            Ok(Box::new(SqliteSource::new(db)))
        }
        SourceKind::Rest {
            base_url,
            timeout_secs,
        } => Ok(Box::new(RestSource::new(base_url, *timeout_secs)?)),
    }
}
