//! Data models
//!
//! Rust structs for the clinical records a report is built from.

mod discharge;
mod evolution;
mod observation;
mod patient;
mod treatment;

pub use discharge::DischargeSummary;
pub use evolution::EvolutionNote;
pub use observation::ClinicalObservation;
pub use patient::PatientRecord;
pub use treatment::TreatmentEntry;
