//! Report generation tools
//!
//! Fetch a patient's records, draw the evolution chart, compose the PDF and
//! write it to disk. The file appears only once it is complete.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::LayoutConfig;
use crate::report::chart::{evolution_series, render_evolution_chart};
use crate::report::{
    ReportComposer, ReportError, ReportInput, ReportResult, RenderedChart, CHART_HEIGHT_PX,
    CHART_WIDTH_PX,
};
use crate::source::{ClinicalSource, PatientBundle};

pub const CONTENT_TYPE_PDF: &str = "application/pdf";

/// One report request as received by the transport
#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub patient_id: String,
    /// Relative to the output directory; may not leave it
    pub output_path: Option<PathBuf>,
    pub treatment_cap: Option<usize>,
    pub evolution_cap: Option<usize>,
}

impl ReportRequest {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateReportResponse {
    pub success: bool,
    pub file_path: String,
    pub content_type: &'static str,
    pub patient_id: String,
    pub page_count: usize,
    pub chart_included: bool,
    pub bytes_written: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub page: usize,
    pub elements: usize,
    pub text_lines: usize,
    pub has_chart: bool,
}

#[derive(Debug, Serialize)]
pub struct LayoutPreviewResponse {
    pub patient_id: String,
    pub page_count: usize,
    /// 1-based page number holding the chart
    pub chart_page: Option<usize>,
    pub pages: Vec<PageSummary>,
}

/// File-name-safe form of an identifier. `[A-Za-z0-9-]` is kept and every
/// other byte becomes `_XX` (uppercase hex), so distinct identifiers never
/// share a file name.
pub fn encode_identifier(patient_id: &str) -> String {
    let mut encoded = String::with_capacity(patient_id.len());
    for byte in patient_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("_{:02X}", byte));
        }
    }
    encoded
}

pub fn default_file_name(patient_id: &str) -> String {
    format!("clinical_report_{}.pdf", encode_identifier(patient_id))
}

/// Where the report lands. A requested path must be relative and made of
/// plain names; `..`, roots and prefixes are refused.
fn resolve_output_path(output_dir: &Path, requested: Option<&Path>, patient_id: &str) -> ReportResult<PathBuf> {
    let Some(requested) = requested else {
        return Ok(output_dir.join(default_file_name(patient_id)));
    };

    let mut relative = PathBuf::new();
    for component in requested.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ReportError::InvalidOutputPath(requested.display().to_string()));
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(ReportError::InvalidOutputPath(requested.display().to_string()));
    }
    Ok(output_dir.join(relative))
}

fn require_identifier(patient_id: &str) -> ReportResult<&str> {
    let trimmed = patient_id.trim();
    if trimmed.is_empty() {
        return Err(ReportError::MissingIdentifier);
    }
    Ok(trimmed)
}

/// Layout with the request's cap overrides applied
fn request_layout(layout: &LayoutConfig, request: &ReportRequest) -> ReportResult<LayoutConfig> {
    let mut layout = layout.clone();
    if let Some(cap) = request.treatment_cap {
        layout.treatment_cap = cap;
    }
    if let Some(cap) = request.evolution_cap {
        layout.evolution_cap = cap;
    }
    layout.validate()?;
    Ok(layout)
}

/// Chart for the bundle, or `None` when there is nothing to plot or drawing fails
fn chart_for(bundle: &PatientBundle) -> Option<RenderedChart> {
    evolution_series(&bundle.observations, &bundle.notes)?;
    match render_evolution_chart(&bundle.observations, &bundle.notes, CHART_WIDTH_PX, CHART_HEIGHT_PX) {
        Ok(chart) => Some(chart),
        Err(e) => {
            warn!(patient_id = %bundle.patient.patient_id, error = %e, "Chart rendering failed; report will omit it");
            None
        }
    }
}

fn input<'a>(bundle: &'a PatientBundle, chart: Option<&'a RenderedChart>) -> ReportInput<'a> {
    ReportInput {
        patient: &bundle.patient,
        treatments: &bundle.treatments,
        observations: &bundle.observations,
        notes: &bundle.notes,
        discharge: bundle.discharge.as_ref(),
        chart,
    }
}

/// Write `bytes` to `path` through a temp file in the same directory
fn write_atomically(path: &Path, bytes: &[u8]) -> ReportResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Generate a clinical evolution PDF report
pub fn generate_clinical_report(
    source: &dyn ClinicalSource,
    layout: &LayoutConfig,
    output_dir: &Path,
    request: &ReportRequest,
) -> ReportResult<GenerateReportResponse> {
    let patient_id = require_identifier(&request.patient_id)?;
    let layout = request_layout(layout, request)?;
    let path = resolve_output_path(output_dir, request.output_path.as_deref(), patient_id)?;

    let bundle = source.fetch_bundle(patient_id)?;
    let chart = chart_for(&bundle);

    let report = ReportComposer::new(layout).compose(&input(&bundle, chart.as_ref()))?;

    write_atomically(&path, &report.bytes)?;

    info!(
        patient_id,
        path = %path.display(),
        pages = report.page_count,
        chart = report.chart_placed,
        "Clinical report written"
    );

    Ok(GenerateReportResponse {
        success: true,
        file_path: path.display().to_string(),
        content_type: CONTENT_TYPE_PDF,
        patient_id: patient_id.to_string(),
        page_count: report.page_count,
        chart_included: report.chart_placed,
        bytes_written: report.bytes.len(),
        message: format!(
            "Clinical report for {} generated: {} page(s), {} treatments, {} observations, {} evolution notes",
            bundle.patient.name,
            report.page_count,
            bundle.treatments.len(),
            bundle.observations.len(),
            bundle.notes.len()
        ),
    })
}

/// Lay the report out and summarize its pages without rendering or writing it
pub fn preview_report_layout(
    source: &dyn ClinicalSource,
    layout: &LayoutConfig,
    patient_id: &str,
) -> ReportResult<LayoutPreviewResponse> {
    let patient_id = require_identifier(patient_id)?;
    let bundle = source.fetch_bundle(patient_id)?;
    let chart = chart_for(&bundle);

    let plan = ReportComposer::new(layout.clone()).plan(&input(&bundle, chart.as_ref()))?;
    debug!(patient_id, pages = plan.page_count(), "Layout previewed");

    Ok(LayoutPreviewResponse {
        patient_id: patient_id.to_string(),
        page_count: plan.page_count(),
        chart_page: plan.chart_page().map(|p| p + 1),
        pages: plan
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| PageSummary {
                page: i + 1,
                elements: page.elements.len(),
                text_lines: page.texts().count(),
                has_chart: page.has_chart(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClinicalObservation, EvolutionNote, PatientRecord, TreatmentEntry};
    use tempfile::TempDir;

    struct FixedSource(PatientBundle);

    impl ClinicalSource for FixedSource {
        fn fetch_bundle(&self, patient_id: &str) -> ReportResult<PatientBundle> {
            if patient_id == "missing" {
                return Err(ReportError::PatientNotFound(patient_id.to_string()));
            }
            Ok(self.0.clone())
        }

        fn kind(&self) -> &'static str {
            "fixed"
        }
    }

    fn bundle() -> PatientBundle {
        PatientBundle {
            patient: PatientRecord {
                patient_id: "P-100".into(),
                name: "Carmen Vidal".into(),
                ..Default::default()
            },
            treatments: (1..=12)
                .map(|i| TreatmentEntry {
                    day_of_stay: i,
                    treatment: format!("Treatment {}", i),
                    route: "IV".into(),
                    side_effects: None,
                })
                .collect(),
            observations: (1..=4)
                .map(|d| ClinicalObservation {
                    timestamp: format!("2025-03-0{}T08:00:00", d),
                    temperature: Some(39.0 - d as f64 * 0.4),
                    crp_mg_l: Some(150.0 - d as f64 * 30.0),
                    ..Default::default()
                })
                .collect(),
            notes: vec![EvolutionNote {
                timestamp: "2025-03-02T12:00:00".into(),
                note: Some("Clinical improvement, afebrile for 24 hours.".into()),
                relapse_risk: Some(0.2),
                ..Default::default()
            }],
            discharge: None,
        }
    }

    fn pdf_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_encode_identifier() {
        assert_eq!(encode_identifier("P-100"), "P-100");
        assert_eq!(encode_identifier("../etc/passwd"), "_2E_2E_2Fetc_2Fpasswd");
        assert_eq!(default_file_name("a b"), "clinical_report_a_20b.pdf");
        assert_eq!(encode_identifier("é"), "_C3_A9");
    }

    #[test]
    fn test_distinct_identifiers_get_distinct_files() {
        let ids = ["a/b", "a_b", "a b", "a?b", "a_2Fb", "ab"];
        let names: std::collections::HashSet<_> = ids.iter().map(|id| default_file_name(id)).collect();
        assert_eq!(names.len(), ids.len());
    }

    #[test]
    fn test_output_path_is_confined() {
        let dir = Path::new("/srv/reports");
        assert_eq!(
            resolve_output_path(dir, Some(Path::new("./nested/r.pdf")), "P-1").unwrap(),
            dir.join("nested/r.pdf")
        );
        assert_eq!(
            resolve_output_path(dir, None, "P-1").unwrap(),
            dir.join("clinical_report_P-1.pdf")
        );
        for bad in ["/tmp/r.pdf", "../r.pdf", "nested/../../r.pdf", ".", ""] {
            let err = resolve_output_path(dir, Some(Path::new(bad)), "P-1").unwrap_err();
            assert!(matches!(err, ReportError::InvalidOutputPath(_)), "{}", bad);
        }
    }

    #[test]
    fn test_escaping_output_path_is_400_and_writes_nothing() {
        let root = TempDir::new().unwrap();
        let out = root.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let source = FixedSource(bundle());

        let outside = root.path().join("outside.pdf");
        for requested in [outside.clone(), PathBuf::from("../outside.pdf")] {
            let request = ReportRequest {
                output_path: Some(requested),
                ..ReportRequest::new("P-100")
            };
            let err = generate_clinical_report(&source, &LayoutConfig::default(), &out, &request)
                .unwrap_err();
            assert_eq!(err.status_code(), 400);
        }
        assert!(!outside.exists());
        assert!(pdf_files(&out).is_empty());
    }

    #[test]
    fn test_generates_pdf_file() {
        let dir = TempDir::new().unwrap();
        let source = FixedSource(bundle());
        let response = generate_clinical_report(
            &source,
            &LayoutConfig::default(),
            dir.path(),
            &ReportRequest::new("P-100"),
        )
        .unwrap();

        let expected = dir.path().join("clinical_report_P-100.pdf");
        assert_eq!(response.file_path, expected.display().to_string());
        assert_eq!(response.content_type, "application/pdf");
        assert!(response.page_count >= 1);

        let bytes = std::fs::read(&expected).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(bytes.len(), response.bytes_written);
        // No temp file left behind
        assert_eq!(pdf_files(dir.path()), vec![expected]);
    }

    #[test]
    fn test_relative_output_path_and_caps() {
        let dir = TempDir::new().unwrap();
        let source = FixedSource(bundle());
        let request = ReportRequest {
            output_path: Some(PathBuf::from("nested/report.pdf")),
            treatment_cap: Some(12),
            ..ReportRequest::new("P-100")
        };
        let response =
            generate_clinical_report(&source, &LayoutConfig::default(), dir.path(), &request).unwrap();
        assert!(dir.path().join("nested/report.pdf").exists());
        assert!(response.success);
    }

    #[test]
    fn test_blank_identifier_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = FixedSource(bundle());
        let err = generate_clinical_report(
            &source,
            &LayoutConfig::default(),
            dir.path(),
            &ReportRequest::new("   "),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::MissingIdentifier));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_unknown_patient_is_404() {
        let dir = TempDir::new().unwrap();
        let source = FixedSource(bundle());
        let err = generate_clinical_report(
            &source,
            &LayoutConfig::default(),
            dir.path(),
            &ReportRequest::new("missing"),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(pdf_files(dir.path()).is_empty());
    }

    #[test]
    fn test_incomplete_record_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let mut broken = bundle();
        broken.patient.patient_id = String::new();
        let source = FixedSource(broken);

        let err = generate_clinical_report(
            &source,
            &LayoutConfig::default(),
            dir.path(),
            &ReportRequest::new("P-100"),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::MissingPatientData { field: "patient_id" }));
        assert_eq!(err.status_code(), 500);
        assert!(pdf_files(dir.path()).is_empty());
    }

    #[test]
    fn test_preview_counts_pages() {
        let source = FixedSource(bundle());
        let preview = preview_report_layout(&source, &LayoutConfig::default(), "P-100").unwrap();
        assert_eq!(preview.pages.len(), preview.page_count);
        // Chart drawing depends on system fonts; either way the summary must agree
        assert_eq!(
            preview.chart_page.is_some(),
            preview.pages.iter().any(|p| p.has_chart)
        );
        assert_eq!(preview.pages[0].page, 1);
    }

    #[test]
    fn test_no_chart_without_series() {
        let mut plain = bundle();
        plain.observations.clear();
        plain.notes[0].relapse_risk = None;
        assert!(chart_for(&plain).is_none());
    }
}
