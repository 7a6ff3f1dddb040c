//! Patient model
//!
//! Demographic and admission data shown in the report header.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// Patient record as stored by the clinical system
///
/// Identifier and name default to empty so that an upstream payload missing
/// them still deserializes; the composer rejects blank values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub name: String,
    pub age: Option<u32>,
    pub sex: Option<String>,
    pub admission_reason: Option<String>,
    /// YYYY-MM-DD
    pub admission_date: Option<String>,
    pub service: Option<String>,
    pub comorbidities: Option<String>,
    pub allergies: Option<String>,
}

impl PatientRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            patient_id: row.get("patient_id")?,
            name: row.get("name")?,
            age: row.get("age")?,
            sex: row.get("sex")?,
            admission_reason: row.get("admission_reason")?,
            admission_date: row.get("admission_date")?,
            service: row.get("service")?,
            comorbidities: row.get("comorbidities")?,
            allergies: row.get("allergies")?,
        })
    }

    /// Get a patient by identifier
    pub fn get(conn: &Connection, patient_id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM patients WHERE patient_id = ?1")?;
        Ok(stmt.query_row([patient_id], Self::from_row).optional()?)
    }

    /// Insert or replace a patient (upsert keyed by identifier)
    pub fn upsert(conn: &Connection, patient: &PatientRecord) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO patients (
                patient_id, name, age, sex, admission_reason,
                admission_date, service, comorbidities, allergies
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(patient_id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                sex = excluded.sex,
                admission_reason = excluded.admission_reason,
                admission_date = excluded.admission_date,
                service = excluded.service,
                comorbidities = excluded.comorbidities,
                allergies = excluded.allergies
            "#,
            params![
                patient.patient_id,
                patient.name,
                patient.age,
                patient.sex,
                patient.admission_reason,
                patient.admission_date,
                patient.service,
                patient.comorbidities,
                patient.allergies,
            ],
        )?;

        Self::get(conn, &patient.patient_id)?.ok_or(DbError::MissingAfterWrite("patient"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_upsert_and_get() {
        let conn = setup();
        let patient = PatientRecord {
            patient_id: "P-001".into(),
            name: "Ana Torres".into(),
            age: Some(67),
            sex: Some("F".into()),
            service: Some("Internal Medicine".into()),
            ..Default::default()
        };

        let stored = PatientRecord::upsert(&conn, &patient).unwrap();
        assert_eq!(stored, patient);

        let renamed = PatientRecord {
            name: "Ana Torres Ruiz".into(),
            ..patient
        };
        PatientRecord::upsert(&conn, &renamed).unwrap();
        let fetched = PatientRecord::get(&conn, "P-001").unwrap().unwrap();
        assert_eq!(fetched.name, "Ana Torres Ruiz");
    }

    #[test]
    fn test_get_unknown_patient() {
        let conn = setup();
        assert!(PatientRecord::get(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn test_deserialize_without_identifier() {
        let patient: PatientRecord = serde_json::from_str(r#"{"name": "X"}"#).unwrap();
        assert!(patient.patient_id.is_empty());
        assert!(patient.allergies.is_none());
    }
}
