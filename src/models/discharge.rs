//! Discharge summary model

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// Discharge summary, at most one per patient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DischargeSummary {
    pub discharge_date: Option<String>,
    pub primary_diagnosis: Option<String>,
    pub secondary_diagnoses: Option<String>,
    pub evolution_summary: Option<String>,
    pub discharge_treatment: Option<String>,
    pub follow_up: Option<String>,
    /// Fraction in [0,1]
    pub relapse_risk: Option<f64>,
    /// Name of the model that drafted the summary
    pub model_name: Option<String>,
}

impl DischargeSummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            discharge_date: row.get("discharge_date")?,
            primary_diagnosis: row.get("primary_diagnosis")?,
            secondary_diagnoses: row.get("secondary_diagnoses")?,
            evolution_summary: row.get("evolution_summary")?,
            discharge_treatment: row.get("discharge_treatment")?,
            follow_up: row.get("follow_up")?,
            relapse_risk: row.get("relapse_risk")?,
            model_name: row.get("model_name")?,
        })
    }

    pub fn get_for_patient(conn: &Connection, patient_id: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM discharge_summaries WHERE patient_id = ?1")?;
        Ok(stmt.query_row([patient_id], Self::from_row).optional()?)
    }

    /// Set or replace the discharge summary for a patient
    pub fn upsert(conn: &Connection, patient_id: &str, summary: &DischargeSummary) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO discharge_summaries (
                patient_id, discharge_date, primary_diagnosis, secondary_diagnoses,
                evolution_summary, discharge_treatment, follow_up, relapse_risk, model_name
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                patient_id,
                summary.discharge_date,
                summary.primary_diagnosis,
                summary.secondary_diagnoses,
                summary.evolution_summary,
                summary.discharge_treatment,
                summary.follow_up,
                summary.relapse_risk,
                summary.model_name,
            ],
        )?;
        Ok(())
    }
}
