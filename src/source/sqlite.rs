//! Local SQLite source

use tracing::debug;

use crate::db::Database;
use crate::models::{
    ClinicalObservation, DischargeSummary, EvolutionNote, PatientRecord, TreatmentEntry,
};
use crate::report::{ReportError, ReportResult};

use super::{ClinicalSource, PatientBundle};

pub struct SqliteSource {
    db: Database,
}

impl SqliteSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ClinicalSource for SqliteSource {
    fn fetch_bundle(&self, patient_id: &str) -> ReportResult<PatientBundle> {
        let bundle = self.db.with_conn(|conn| {
            let Some(patient) = PatientRecord::get(conn, patient_id)? else {
                return Ok(None);
            };
            Ok(Some(PatientBundle {
                patient,
                treatments: TreatmentEntry::list_for_patient(conn, patient_id)?,
                observations: ClinicalObservation::list_for_patient(conn, patient_id)?,
                notes: EvolutionNote::list_for_patient(conn, patient_id)?,
                discharge: DischargeSummary::get_for_patient(conn, patient_id)?,
            }))
        })?;

        let bundle = bundle.ok_or_else(|| ReportError::PatientNotFound(patient_id.to_string()))?;
        debug!(
            patient_id,
            treatments = bundle.treatments.len(),
            observations = bundle.observations.len(),
            notes = bundle.notes.len(),
            "Loaded patient records"
        );
        Ok(bundle)
    }

    fn kind(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source() -> (TempDir, Database, SqliteSource) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_migrated(dir.path().join("test.db")).unwrap();
        (dir, db.clone(), SqliteSource::new(db))
    }

    #[test]
    fn test_unknown_patient() {
        let (_dir, _db, source) = source();
        let err = source.fetch_bundle("nobody").unwrap_err();
        assert!(matches!(err, ReportError::PatientNotFound(id) if id == "nobody"));
    }

    #[test]
    fn test_fetch_bundle_in_order() {
        let (_dir, db, source) = source();
        db.with_conn(|conn| {
            PatientRecord::upsert(
                conn,
                &PatientRecord {
                    patient_id: "P-1".into(),
                    name: "Ana Ruiz".into(),
                    ..Default::default()
                },
            )?;
            for (day, name) in [(1, "Ceftriaxone"), (2, "Paracetamol")] {
                TreatmentEntry::insert(
                    conn,
                    "P-1",
                    &TreatmentEntry {
                        day_of_stay: day,
                        treatment: name.into(),
                        route: "IV".into(),
                        side_effects: None,
                    },
                )?;
            }
            for ts in ["2025-03-02T08:00:00", "2025-03-01T08:00:00"] {
                ClinicalObservation::insert(
                    conn,
                    "P-1",
                    &ClinicalObservation {
                        timestamp: ts.into(),
                        temperature: Some(37.5),
                        ..Default::default()
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();

        let bundle = source.fetch_bundle("P-1").unwrap();
        assert_eq!(bundle.patient.name, "Ana Ruiz");
        assert_eq!(bundle.treatments[0].treatment, "Ceftriaxone");
        assert_eq!(bundle.observations[0].timestamp, "2025-03-01T08:00:00");
        assert!(bundle.notes.is_empty());
        assert!(bundle.discharge.is_none());
    }
}
