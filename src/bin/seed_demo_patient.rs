//! Utility to seed a demo patient into the clinical database

use medai_report::config::default_database_path;
use medai_report::db::Database;
use medai_report::models::{
    ClinicalObservation, DischargeSummary, EvolutionNote, PatientRecord, TreatmentEntry,
};

const PATIENT_ID: &str = "DEMO-001";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = default_database_path();
    println!("Database path: {}", db_path.display());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::open_migrated(&db_path)?;

    database.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        // Start from a clean slate for the demo patient
        for table in ["treatments", "clinical_results", "evolution", "discharge_summaries"] {
            tx.execute(&format!("DELETE FROM {} WHERE patient_id = ?1", table), [PATIENT_ID])?;
        }

        let patient = PatientRecord::upsert(
            &tx,
            &PatientRecord {
                patient_id: PATIENT_ID.into(),
                name: "Maria Lopez Garcia".into(),
                age: Some(78),
                sex: Some("F".into()),
                admission_reason: Some(
                    "Fever, productive cough and dyspnoea for three days; right lower lobe consolidation on chest X-ray"
                        .into(),
                ),
                admission_date: Some("2025-03-01".into()),
                service: Some("Internal Medicine".into()),
                comorbidities: Some("Type 2 diabetes mellitus, hypertension, chronic kidney disease stage 3a".into()),
                allergies: Some("Penicillin (rash)".into()),
            },
        )?;

        let treatments = [
            (1, "Ceftriaxone 2 g every 24 h", "IV", None),
            (1, "Azithromycin 500 mg every 24 h", "IV", Some("Mild nausea")),
            (1, "Paracetamol 1 g every 8 h as needed", "IV", None),
            (1, "Enoxaparin 40 mg every 24 h", "SC", None),
            (2, "Oxygen therapy 2 L/min via nasal cannula", "Inhaled", None),
            (2, "Insulin glargine 14 IU at night", "SC", Some("Hypoglycaemia 62 mg/dL on day 3")),
            (3, "Omeprazole 20 mg every 24 h", "PO", None),
            (4, "Azithromycin 500 mg every 24 h", "PO", None),
            (5, "Cefditoren 400 mg every 12 h", "PO", Some("Diarrhoea, self-limited")),
            (6, "Respiratory physiotherapy", "Other", None),
        ];
        for (day, treatment, route, side_effects) in treatments {
            TreatmentEntry::insert(
                &tx,
                PATIENT_ID,
                &TreatmentEntry {
                    day_of_stay: day,
                    treatment: treatment.into(),
                    route: route.into(),
                    side_effects: side_effects.map(String::from),
                },
            )?;
        }

        let observations = [
            ("2025-03-01T08:00:00", 38.9, 104.0, 91.0, 182.0),
            ("2025-03-02T08:00:00", 38.4, 98.0, 93.0, 165.0),
            ("2025-03-03T08:00:00", 37.8, 92.0, 94.0, 121.0),
            ("2025-03-04T08:00:00", 37.2, 86.0, 95.0, 74.0),
            ("2025-03-05T08:00:00", 36.9, 82.0, 96.0, 41.0),
            ("2025-03-06T08:00:00", 36.7, 78.0, 97.0, 22.0),
        ];
        for (timestamp, temperature, heart_rate, spo2, crp) in observations {
            ClinicalObservation::insert(
                &tx,
                PATIENT_ID,
                &ClinicalObservation {
                    timestamp: timestamp.into(),
                    temperature: Some(temperature),
                    heart_rate: Some(heart_rate),
                    oxygen_saturation: Some(spo2),
                    crp_mg_l: Some(crp),
                },
            )?;
        }

        let notes = [
            ("2025-03-01T12:00:00", "Admitted with community-acquired pneumonia, CURB-65 score 2. Empirical antibiotics started.", "Poor", 4, "Bed-bound", "Poor", 0.42),
            ("2025-03-02T12:00:00", "Persistent fever, oxygen requirement unchanged.", "Poor", 3, "Bed-bound", "Poor", 0.38),
            ("2025-03-03T12:00:00", "Fever decreasing. Tolerating oral fluids.", "Fair", 3, "Chair", "Fair", 0.30),
            ("2025-03-04T12:00:00", "Afebrile for 24 hours. Oxygen weaned. Switched to oral antibiotics.", "Fair", 2, "Walks with help", "Fair", 0.22),
            ("2025-03-05T12:00:00", "Clinically stable. Walking in the ward.", "Good", 1, "Independent", "Good", 0.15),
            ("2025-03-06T12:00:00", "Ready for discharge. Family informed.", "Good", 1, "Independent", "Good", 0.12),
        ];
        for (timestamp, note, state, pain, mobility, appetite, risk) in notes {
            EvolutionNote::insert(
                &tx,
                PATIENT_ID,
                &EvolutionNote {
                    timestamp: timestamp.into(),
                    note: Some(note.into()),
                    general_state: Some(state.into()),
                    pain_level: Some(pain),
                    mobility: Some(mobility.into()),
                    appetite: Some(appetite.into()),
                    relapse_risk: Some(risk),
                },
            )?;
        }

        DischargeSummary::upsert(
            &tx,
            PATIENT_ID,
            &DischargeSummary {
                discharge_date: Some("2025-03-07".into()),
                primary_diagnosis: Some("Right lower lobe community-acquired pneumonia".into()),
                secondary_diagnoses: Some("Decompensated type 2 diabetes; acute-on-chronic kidney injury, resolved".into()),
                evolution_summary: Some(
                    "Favourable course with intravenous then oral antibiotics. Afebrile from day 4, CRP fell from 182 to 22 mg/L."
                        .into(),
                ),
                discharge_treatment: Some("Cefditoren 400 mg every 12 h until day 10; usual medication".into()),
                follow_up: Some("Primary care review in 7 days; chest X-ray in 6 weeks".into()),
                relapse_risk: Some(0.12),
                model_name: Some("medai-evolution-v1".into()),
            },
        )?;

        tx.commit()?;

        println!("Seeded demo patient:");
        println!("  ID: {}", patient.patient_id);
        println!("  Name: {}", patient.name);
        println!("  Treatments: {}", treatments.len());
        println!("  Observations: {}", observations.len());
        println!("  Evolution notes: {}", notes.len());
        Ok(())
    })?;

    Ok(())
}
