//! Report composition
//!
//! Lays a patient's records out over as many pages as needed and renders the
//! result. Sections, in order: header, background, treatments, clinical
//! evolution (chart, observations, assessments, notes), discharge summary,
//! footer on the last page.

use chrono::{Local, NaiveDateTime};
use printpdf::image_crate::DynamicImage;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::models::{
    ClinicalObservation, DischargeSummary, EvolutionNote, PatientRecord, TreatmentEntry,
};
use crate::report::chart::RenderedChart;
use crate::report::error::{ReportError, ReportResult};
use crate::report::layout::{
    Column, DocumentPlan, Element, FontStyle, PageCursor, PageLayout, TableSpec, TextStyle,
    BODY_SIZE, COLOR_BLACK, COLOR_NAVY, COLOR_STEEL, PLACEHOLDER,
};
use crate::report::pdf::{decode_chart, render_pdf};

pub const REPORT_TITLE: &str = "Clinical Evolution Report";
pub const ATTRIBUTION: &str = "Automatically generated by MedAI Evolution Assistant";

pub const NO_TREATMENTS: &str = "No treatments recorded.";
pub const NO_EVOLUTION: &str = "No clinical evolution data recorded.";
pub const NO_OBSERVATIONS: &str = "No clinical observations recorded.";
pub const NO_ASSESSMENTS: &str = "No evolution assessments recorded.";

/// Title, patient line, demographics, admission date and rule
const HEADER_HEIGHT: f32 = 76.0;
const SECTION_GAP: f32 = 10.0;

fn treatment_table() -> TableSpec {
    TableSpec {
        columns: vec![
            Column::new("Day", 56.7),
            Column::new("Treatment", 170.1),
            Column::new("Route", 85.0),
            Column::new("Side effects", 141.7),
        ],
        header_color: COLOR_NAVY,
    }
}

fn observation_table() -> TableSpec {
    TableSpec {
        columns: vec![
            Column::new("Date", 85.0),
            Column::new("Temp (C)", 70.0),
            Column::new("HR (bpm)", 70.0),
            Column::new("SpO2 (%)", 70.0),
            Column::new("CRP (mg/L)", 80.0),
        ],
        header_color: COLOR_STEEL,
    }
}

fn assessment_table() -> TableSpec {
    TableSpec {
        columns: vec![
            Column::new("Date", 85.0),
            Column::new("State", 85.0),
            Column::new("Pain", 45.0),
            Column::new("Mobility", 85.0),
            Column::new("Appetite", 75.0),
            Column::new("Relapse risk", 85.0),
        ],
        header_color: COLOR_STEEL,
    }
}

/// Everything one report is built from, borrowed from the caller
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub patient: &'a PatientRecord,
    pub treatments: &'a [TreatmentEntry],
    pub observations: &'a [ClinicalObservation],
    pub notes: &'a [EvolutionNote],
    pub discharge: Option<&'a DischargeSummary>,
    pub chart: Option<&'a RenderedChart>,
}

#[derive(Debug, Serialize)]
pub struct ComposedReport {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub chart_placed: bool,
}

pub struct ReportComposer {
    config: LayoutConfig,
    generated_at: NaiveDateTime,
}

impl ReportComposer {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            generated_at: Local::now().naive_local(),
        }
    }

    /// Pin the footer timestamp
    pub fn with_generated_at(mut self, generated_at: NaiveDateTime) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// Lay the report out without rendering it
    pub fn plan(&self, input: &ReportInput) -> ReportResult<DocumentPlan> {
        validate(input)?;
        let chart = usable_chart(input.chart).map(|(chart, _)| chart);
        Ok(self.layout(input, chart))
    }

    /// Lay out and render the report to PDF bytes
    pub fn compose(&self, input: &ReportInput) -> ReportResult<ComposedReport> {
        validate(input)?;
        let usable = usable_chart(input.chart);
        let plan = self.layout(input, usable.as_ref().map(|(chart, _)| *chart));
        let image = usable.as_ref().map(|(_, image)| image);
        let bytes = render_pdf(&plan, image)?;

        debug!(
            patient_id = %input.patient.patient_id,
            pages = plan.page_count(),
            bytes = bytes.len(),
            "Report composed"
        );

        Ok(ComposedReport {
            bytes,
            page_count: plan.page_count(),
            chart_placed: plan.chart_count() > 0,
        })
    }

    fn layout(&self, input: &ReportInput, chart: Option<&RenderedChart>) -> DocumentPlan {
        let patient = input.patient;
        let continuation = format!("{} - {}", REPORT_TITLE, patient.name);
        let (mut layout, cursor) = PageLayout::new(&self.config, continuation);

        let cursor = self.header(&mut layout, cursor, patient);
        let cursor = self.background(&mut layout, cursor, patient);
        let cursor = self.treatments(&mut layout, cursor, input.treatments);
        let cursor = self.evolution(&mut layout, cursor, input, chart);
        if let Some(discharge) = input.discharge {
            self.discharge(&mut layout, cursor, discharge);
        }

        let footer = format!(
            "{} on {}",
            ATTRIBUTION,
            self.generated_at.format("%d/%m/%Y %H:%M")
        );
        layout.finish(REPORT_TITLE, &footer)
    }

    fn header(&self, layout: &mut PageLayout, cursor: PageCursor, patient: &PatientRecord) -> PageCursor {
        let age = patient
            .age
            .map(|a| format!("{} years", a))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let lines = [
            (18.0, FontStyle::Bold, COLOR_NAVY, REPORT_TITLE.to_string(), 22.0),
            (
                13.0,
                FontStyle::Bold,
                COLOR_NAVY,
                format!("Patient: {} (ID: {})", patient.name, patient.patient_id),
                16.0,
            ),
            (
                BODY_SIZE,
                FontStyle::Regular,
                COLOR_BLACK,
                format!(
                    "Age: {}    Sex: {}    Service: {}",
                    age,
                    or_placeholder(patient.sex.as_deref()),
                    or_placeholder(patient.service.as_deref()),
                ),
                14.0,
            ),
            (
                BODY_SIZE,
                FontStyle::Regular,
                COLOR_BLACK,
                format!(
                    "Admission date: {}",
                    or_placeholder(patient.admission_date.as_deref())
                ),
                10.0,
            ),
        ];

        let mut y = cursor.y;
        for (size, font, color, text, advance) in lines {
            layout.push(
                cursor,
                Element::Text {
                    x: self.config.margin_left,
                    y,
                    size,
                    font,
                    color,
                    text,
                },
            );
            y -= advance;
        }
        layout.rule(cursor, y);

        layout.gap(cursor, HEADER_HEIGHT)
    }

    fn background(&self, layout: &mut PageLayout, cursor: PageCursor, patient: &PatientRecord) -> PageCursor {
        let fields = [
            ("Admission reason", patient.admission_reason.as_deref()),
            ("Comorbidities", patient.comorbidities.as_deref()),
            ("Allergies", patient.allergies.as_deref()),
        ];
        let cursor = fields.iter().fold(cursor, |cursor, (label, value)| {
            labelled(layout, cursor, label, *value)
        });
        layout.gap(cursor, SECTION_GAP)
    }

    fn treatments(&self, layout: &mut PageLayout, cursor: PageCursor, treatments: &[TreatmentEntry]) -> PageCursor {
        let mut cursor = layout.heading(cursor, "Main treatments");
        if treatments.is_empty() {
            cursor = layout.line(cursor, self.config.margin_left, NO_TREATMENTS, TextStyle::BODY);
            return layout.gap(cursor, SECTION_GAP);
        }

        cursor = layout.begin_table(cursor, treatment_table());
        for entry in treatments.iter().take(self.config.treatment_cap) {
            let cells = [
                entry.day_of_stay.to_string(),
                entry.treatment.clone(),
                entry.route.clone(),
                or_placeholder(entry.side_effects.as_deref()).to_string(),
            ];
            cursor = layout.table_row(cursor, &cells);
        }
        cursor = layout.end_table(cursor);

        if treatments.len() > self.config.treatment_cap {
            let note = format!(
                "Showing {} of {} treatments.",
                self.config.treatment_cap,
                treatments.len()
            );
            cursor = layout.line(cursor, self.config.margin_left, &note, TextStyle::NOTE);
        }
        layout.gap(cursor, SECTION_GAP)
    }

    fn evolution(
        &self,
        layout: &mut PageLayout,
        cursor: PageCursor,
        input: &ReportInput,
        chart: Option<&RenderedChart>,
    ) -> PageCursor {
        if input.observations.is_empty() && input.notes.is_empty() {
            let cursor = layout.heading(cursor, "Clinical evolution");
            let cursor = layout.line(cursor, self.config.margin_left, NO_EVOLUTION, TextStyle::BODY);
            return layout.gap(cursor, SECTION_GAP);
        }

        let chart_size = chart.and_then(|c| self.chart_size(layout, c));

        // Keep the heading on the chart's page
        let mut cursor = cursor;
        if let Some((_, height)) = chart_size {
            let needed = self.config.line_height + 4.0 + height;
            if cursor.y - needed < self.config.bottom_margin {
                cursor = layout.page_break(cursor);
            }
        }
        cursor = layout.heading(cursor, "Clinical evolution");

        if let Some((width, height)) = chart_size {
            cursor = layout.chart(cursor, width, height);
        }

        cursor = self.subheading(layout, cursor, "Vital signs and biomarkers");
        cursor = self.observations(layout, cursor, input.observations);

        cursor = self.subheading(layout, cursor, "Medical assessments");
        cursor = self.assessments(layout, cursor, input.notes);

        let written: Vec<_> = input
            .notes
            .iter()
            .filter_map(|n| n.text().map(|text| (n, text)))
            .collect();
        if !written.is_empty() {
            cursor = self.subheading(layout, cursor, "Clinical notes");
            for (note, text) in written {
                let line = format!("{}: {}", display_timestamp(&note.timestamp), text);
                cursor = layout.paragraph(cursor, &line, TextStyle::BODY);
            }
        }

        layout.gap(cursor, SECTION_GAP)
    }

    fn observations(&self, layout: &mut PageLayout, cursor: PageCursor, observations: &[ClinicalObservation]) -> PageCursor {
        if observations.is_empty() {
            return layout.line(cursor, self.config.margin_left, NO_OBSERVATIONS, TextStyle::BODY);
        }

        let shown = last(observations, self.config.observation_cap);
        let mut cursor = layout.begin_table(cursor, observation_table());
        for obs in shown {
            let cells = [
                display_timestamp(&obs.timestamp),
                format_number(obs.temperature, 1),
                format_number(obs.heart_rate, 0),
                format_number(obs.oxygen_saturation, 0),
                format_number(obs.crp_mg_l, 1),
            ];
            cursor = layout.table_row(cursor, &cells);
        }
        cursor = layout.end_table(cursor);
        self.cap_note(layout, cursor, shown.len(), observations.len(), "observations")
    }

    fn assessments(&self, layout: &mut PageLayout, cursor: PageCursor, notes: &[EvolutionNote]) -> PageCursor {
        if notes.is_empty() {
            return layout.line(cursor, self.config.margin_left, NO_ASSESSMENTS, TextStyle::BODY);
        }

        let shown = last(notes, self.config.evolution_cap);
        let mut cursor = layout.begin_table(cursor, assessment_table());
        for note in shown {
            let cells = [
                display_timestamp(&note.timestamp),
                or_placeholder(note.general_state.as_deref()).to_string(),
                note.pain_level
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
                or_placeholder(note.mobility.as_deref()).to_string(),
                or_placeholder(note.appetite.as_deref()).to_string(),
                format_risk(note.relapse_risk),
            ];
            cursor = layout.table_row(cursor, &cells);
        }
        cursor = layout.end_table(cursor);
        self.cap_note(layout, cursor, shown.len(), notes.len(), "assessments")
    }

    fn discharge(&self, layout: &mut PageLayout, cursor: PageCursor, discharge: &DischargeSummary) -> PageCursor {
        let cursor = layout.heading(cursor, "Discharge summary");
        let risk = discharge.relapse_risk.map(|r| format_risk(Some(r)));
        let fields = [
            ("Discharge date", discharge.discharge_date.as_deref()),
            ("Primary diagnosis", discharge.primary_diagnosis.as_deref()),
            ("Secondary diagnoses", discharge.secondary_diagnoses.as_deref()),
            ("Evolution summary", discharge.evolution_summary.as_deref()),
            ("Discharge treatment", discharge.discharge_treatment.as_deref()),
            ("Follow-up", discharge.follow_up.as_deref()),
            ("Estimated relapse risk", risk.as_deref()),
            ("Generated by model", discharge.model_name.as_deref()),
        ];
        let cursor = fields.iter().fold(cursor, |cursor, (label, value)| {
            labelled(layout, cursor, label, *value)
        });
        layout.gap(cursor, SECTION_GAP)
    }

    fn subheading(&self, layout: &mut PageLayout, cursor: PageCursor, title: &str) -> PageCursor {
        let cursor = layout.ensure_lines(cursor, 3);
        layout.line(cursor, self.config.margin_left, title, TextStyle::BODY_BOLD)
    }

    fn cap_note(&self, layout: &mut PageLayout, cursor: PageCursor, shown: usize, total: usize, what: &str) -> PageCursor {
        if shown >= total {
            return cursor;
        }
        let note = format!("Showing last {} of {} {}.", shown, total, what);
        layout.line(cursor, self.config.margin_left, &note, TextStyle::NOTE)
    }

    /// Display size in points: configured width, aspect-preserving height,
    /// shrunk to fit an empty page
    fn chart_size(&self, layout: &PageLayout, chart: &RenderedChart) -> Option<(f32, f32)> {
        let ratio = chart.aspect_ratio()?;
        let mut width = self.config.chart_width.min(self.config.content_width());
        let mut height = width * ratio;
        let max_height = layout.max_block_height() - (self.config.line_height + 4.0) - 1.0;
        if height > max_height {
            height = max_height;
            width = height / ratio;
        }
        Some((width, height))
    }
}

/// Required fields and value ranges; nothing is laid out if this fails
pub fn validate(input: &ReportInput) -> ReportResult<()> {
    let patient = input.patient;
    if patient.patient_id.trim().is_empty() {
        return Err(ReportError::MissingPatientData { field: "patient_id" });
    }
    if patient.name.trim().is_empty() {
        return Err(ReportError::MissingPatientData { field: "name" });
    }

    for (i, t) in input.treatments.iter().enumerate() {
        if t.treatment.trim().is_empty() {
            return Err(ReportError::composition(
                format!("treatments[{}].treatment", i),
                "empty description",
            ));
        }
        if t.day_of_stay < 0 {
            return Err(ReportError::composition(
                format!("treatments[{}].day_of_stay", i),
                format!("negative day {}", t.day_of_stay),
            ));
        }
    }

    for (i, o) in input.observations.iter().enumerate() {
        let values = [
            ("temperature", o.temperature),
            ("heart_rate", o.heart_rate),
            ("oxygen_saturation", o.oxygen_saturation),
            ("crp_mg_l", o.crp_mg_l),
        ];
        for (name, value) in values {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(ReportError::composition(
                    format!("observations[{}].{}", i, name),
                    "not a finite number",
                ));
            }
        }
    }

    for (i, n) in input.notes.iter().enumerate() {
        check_risk(n.relapse_risk, || format!("evolution[{}].relapse_risk", i))?;
        if let Some(pain) = n.pain_level.filter(|p| *p > 10) {
            return Err(ReportError::composition(
                format!("evolution[{}].pain_level", i),
                format!("{} outside 0-10", pain),
            ));
        }
    }

    if let Some(d) = input.discharge {
        check_risk(d.relapse_risk, || "discharge.relapse_risk".to_string())?;
    }
    Ok(())
}

fn check_risk(risk: Option<f64>, field: impl FnOnce() -> String) -> ReportResult<()> {
    match risk {
        Some(r) if !(0.0..=1.0).contains(&r) => Err(ReportError::composition(
            field(),
            format!("{} is not a fraction in [0,1]", r),
        )),
        _ => Ok(()),
    }
}

/// The chart and its decoded image, or `None` if there is no usable chart
fn usable_chart(chart: Option<&RenderedChart>) -> Option<(&RenderedChart, DynamicImage)> {
    let chart = chart?;
    match decode_chart(chart) {
        Ok(image) => Some((chart, image)),
        Err(e) => {
            warn!(error = %e, "Continuing without chart");
            None
        }
    }
}

fn labelled(layout: &mut PageLayout, cursor: PageCursor, label: &str, value: Option<&str>) -> PageCursor {
    let text = format!("{}: {}", label, or_placeholder(value));
    layout.paragraph(cursor, &text, TextStyle::BODY)
}

fn last<T>(items: &[T], cap: usize) -> &[T] {
    &items[items.len().saturating_sub(cap)..]
}

fn or_placeholder(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(PLACEHOLDER)
}

fn format_number(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Fraction rendered as a percentage with one decimal
pub fn format_risk(risk: Option<f64>) -> String {
    risk.map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// "2025-03-01T08:30:00" -> "2025-03-01 08:30"
fn display_timestamp(timestamp: &str) -> String {
    let trimmed = timestamp.trim();
    if trimmed.is_empty() {
        return PLACEHOLDER.to_string();
    }
    trimmed.replacen('T', " ", 1).chars().take(16).collect()
}
