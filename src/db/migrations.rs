//! Database migrations
//!
//! Schema for patients and their clinical sequences.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
    }

    Ok(())
}

/// Get the applied schema version (0 for a fresh database)
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- PATIENTS
        -- One row per admitted patient
        -- ============================================
        CREATE TABLE patients (
            patient_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER,
            sex TEXT,
            admission_reason TEXT,
            admission_date TEXT,                 -- YYYY-MM-DD
            service TEXT,                        -- department
            comorbidities TEXT,
            allergies TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ============================================
        -- TREATMENTS
        -- Insertion order is chronological
        -- ============================================
        CREATE TABLE treatments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id TEXT NOT NULL REFERENCES patients(patient_id) ON DELETE CASCADE,
            day_of_stay INTEGER NOT NULL,
            treatment TEXT NOT NULL,
            route TEXT NOT NULL,                 -- administration route
            side_effects TEXT
        );

        CREATE INDEX idx_treatments_patient ON treatments(patient_id, id);

        -- ============================================
        -- CLINICAL RESULTS
        -- Vitals and biomarkers, any subset per row
        -- ============================================
        CREATE TABLE clinical_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id TEXT NOT NULL REFERENCES patients(patient_id) ON DELETE CASCADE,
            timestamp TEXT NOT NULL,             -- ISO 8601
            temperature REAL,                    -- Celsius
            heart_rate REAL,                     -- bpm
            oxygen_saturation REAL,              -- %
            crp_mg_l REAL                        -- C-reactive protein, mg/L
        );

        CREATE INDEX idx_clinical_results_patient ON clinical_results(patient_id, timestamp);

        -- ============================================
        -- EVOLUTION
        -- Free-text notes and structured assessments
        -- ============================================
        CREATE TABLE evolution (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id TEXT NOT NULL REFERENCES patients(patient_id) ON DELETE CASCADE,
            timestamp TEXT NOT NULL,
            note TEXT,
            general_state TEXT,
            pain_level INTEGER,                  -- 0-10
            mobility TEXT,
            appetite TEXT,
            relapse_risk REAL                    -- fraction in [0,1]
        );

        CREATE INDEX idx_evolution_patient ON evolution(patient_id, timestamp);

        -- ============================================
        -- DISCHARGE SUMMARIES
        -- At most one per patient
        -- ============================================
        CREATE TABLE discharge_summaries (
            patient_id TEXT PRIMARY KEY REFERENCES patients(patient_id) ON DELETE CASCADE,
            discharge_date TEXT,
            primary_diagnosis TEXT,
            secondary_diagnoses TEXT,
            evolution_summary TEXT,
            discharge_treatment TEXT,
            follow_up TEXT,
            relapse_risk REAL,                   -- fraction in [0,1]
            model_name TEXT
        );
        "#,
    )?;

    Ok(())
}
