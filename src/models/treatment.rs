//! Treatment model
//!
//! Treatments administered during the stay, kept in insertion order.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// A treatment given on a given day of the stay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentEntry {
    pub day_of_stay: i32,
    pub treatment: String,
    /// Administration route (oral, IV, ...)
    pub route: String,
    pub side_effects: Option<String>,
}

impl TreatmentEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            day_of_stay: row.get("day_of_stay")?,
            treatment: row.get("treatment")?,
            route: row.get("route")?,
            side_effects: row.get("side_effects")?,
        })
    }

    /// List treatments for a patient in insertion order
    pub fn list_for_patient(conn: &Connection, patient_id: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM treatments WHERE patient_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([patient_id], Self::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Append a treatment for a patient
    pub fn insert(conn: &Connection, patient_id: &str, entry: &TreatmentEntry) -> DbResult<i64> {
        conn.execute(
            r#"
            INSERT INTO treatments (patient_id, day_of_stay, treatment, route, side_effects)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                patient_id,
                entry.day_of_stay,
                entry.treatment,
                entry.route,
                entry.side_effects,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}
