//! Evolution note model
//!
//! Daily clinical notes and structured bedside assessments.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// A clinical note, a structured assessment, or both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionNote {
    pub timestamp: String,
    /// Free-text clinical note
    pub note: Option<String>,
    pub general_state: Option<String>,
    /// 0-10
    pub pain_level: Option<u8>,
    pub mobility: Option<String>,
    pub appetite: Option<String>,
    /// Estimated relapse risk as a fraction in [0,1]
    pub relapse_risk: Option<f64>,
}

impl EvolutionNote {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            timestamp: row.get("timestamp")?,
            note: row.get("note")?,
            general_state: row.get("general_state")?,
            pain_level: row.get("pain_level")?,
            mobility: row.get("mobility")?,
            appetite: row.get("appetite")?,
            relapse_risk: row.get("relapse_risk")?,
        })
    }

    /// List evolution notes for a patient, oldest first
    pub fn list_for_patient(conn: &Connection, patient_id: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM evolution WHERE patient_id = ?1 ORDER BY timestamp, id",
        )?;
        let rows = stmt.query_map([patient_id], Self::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert(conn: &Connection, patient_id: &str, note: &EvolutionNote) -> DbResult<i64> {
        conn.execute(
            r#"
            INSERT INTO evolution
                (patient_id, timestamp, note, general_state, pain_level, mobility, appetite, relapse_risk)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                patient_id,
                note.timestamp,
                note.note,
                note.general_state,
                note.pain_level,
                note.mobility,
                note.appetite,
                note.relapse_risk,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Free-text note, if present and not blank
    pub fn text(&self) -> Option<&str> {
        self.note.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
