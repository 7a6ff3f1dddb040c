//! Clinical observation model
//!
//! Vital signs and biomarkers sampled during the stay.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

/// One timestamped set of measurements; any subset of the values may be present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalObservation {
    pub timestamp: String,
    /// Celsius
    pub temperature: Option<f64>,
    /// Beats per minute
    pub heart_rate: Option<f64>,
    /// Percent
    pub oxygen_saturation: Option<f64>,
    /// C-reactive protein, mg/L
    pub crp_mg_l: Option<f64>,
}

impl ClinicalObservation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            timestamp: row.get("timestamp")?,
            temperature: row.get("temperature")?,
            heart_rate: row.get("heart_rate")?,
            oxygen_saturation: row.get("oxygen_saturation")?,
            crp_mg_l: row.get("crp_mg_l")?,
        })
    }

    /// List observations for a patient, oldest first
    pub fn list_for_patient(conn: &Connection, patient_id: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM clinical_results WHERE patient_id = ?1 ORDER BY timestamp, id",
        )?;
        let rows = stmt.query_map([patient_id], Self::from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn insert(conn: &Connection, patient_id: &str, obs: &ClinicalObservation) -> DbResult<i64> {
        conn.execute(
            r#"
            INSERT INTO clinical_results
                (patient_id, timestamp, temperature, heart_rate, oxygen_saturation, crp_mg_l)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                patient_id,
                obs.timestamp,
                obs.temperature,
                obs.heart_rate,
                obs.oxygen_saturation,
                obs.crp_mg_l,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    #[test]
    fn test_list_is_chronological() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute("INSERT INTO patients (patient_id, name) VALUES ('P-1', 'Ana')", [])
            .unwrap();

        for (ts, crp) in [("2025-03-02T08:00:00", Some(40.0)), ("2025-03-01T08:00:00", None)] {
            let obs = ClinicalObservation {
                timestamp: ts.into(),
                crp_mg_l: crp,
                ..Default::default()
            };
            ClinicalObservation::insert(&conn, "P-1", &obs).unwrap();
        }

        let listed = ClinicalObservation::list_for_patient(&conn, "P-1").unwrap();
        assert_eq!(listed[0].timestamp, "2025-03-01T08:00:00");
        assert_eq!(listed[0].crp_mg_l, None);
        assert_eq!(listed[1].crp_mg_l, Some(40.0));
    }
}
