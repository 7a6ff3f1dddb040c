//! MedAI MCP Server Implementation
//!
//! Exposes report generation over MCP stdio.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::{LayoutConfig, ServiceConfig, SourceKind};
use crate::report::ReportError;
use crate::source::ClinicalSource;
use crate::tools::reports::{self, ReportRequest};
use crate::tools::status::StatusTracker;

/// MedAI MCP Service
#[derive(Clone)]
pub struct MedaiService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    source: Arc<dyn ClinicalSource>,
    layout: LayoutConfig,
    output_dir: PathBuf,
    tool_router: ToolRouter<MedaiService>,
}

impl MedaiService {
    pub fn new(config: &ServiceConfig, source: Arc<dyn ClinicalSource>) -> Self {
        let database_path = match config.source {
            SourceKind::Sqlite => Some(config.database_path.clone()),
            SourceKind::Rest { .. } => None,
        };
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                source.kind(),
                database_path,
                config.output_dir.clone(),
            ))),
            source,
            layout: config.layout.clone(),
            output_dir: config.output_dir.clone(),
            tool_router: Self::tool_router(),
        }
    }
}

/// Map a report error onto the MCP error carrying its HTTP-equivalent status
fn report_error(e: ReportError) -> McpError {
    let status = e.status_code();
    let data = Some(serde_json::json!({ "status": status }));
    match status {
        400 => McpError::invalid_params(e.to_string(), data),
        404 => McpError::resource_not_found(e.to_string(), data),
        _ => McpError::internal_error(e.to_string(), data),
    }
}

fn json_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Tool Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateClinicalReportParams {
    /// Patient identifier
    #[serde(default)]
    pub patient_id: String,
    /// Output file path inside the output directory (no absolute paths or `..`).
    /// Defaults to clinical_report_<encoded patient_id>.pdf
    pub output_path: Option<String>,
    /// Number of treatments to list (first N, default 8)
    pub treatment_cap: Option<usize>,
    /// Number of evolution assessments to list (last N, default 5)
    pub evolution_cap: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewReportLayoutParams {
    /// Patient identifier
    #[serde(default)]
    pub patient_id: String,
}

// ============================================================================
// Tool Router Implementation
// ============================================================================

#[tool_router]
impl MedaiService {
    #[tool(description = "Get the current status of the MedAI report service including build info, data source and process information")]
    async fn medai_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        json_result(&tracker.get_status())
    }

    #[tool(description = "Get instructions for generating clinical evolution reports, including parameters and error codes")]
    fn report_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::REPORT_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(REPORT_INSTRUCTIONS)]))
    }

    #[tool(description = "Generate a paginated clinical evolution PDF report for a patient: header, background, treatments, evolution chart and tables, discharge summary")]
    async fn generate_clinical_report(
        &self,
        Parameters(p): Parameters<GenerateClinicalReportParams>,
    ) -> Result<CallToolResult, McpError> {
        let source = Arc::clone(&self.source);
        let layout = self.layout.clone();
        let output_dir = self.output_dir.clone();
        let request = ReportRequest {
            patient_id: p.patient_id,
            output_path: p.output_path.map(PathBuf::from),
            treatment_cap: p.treatment_cap,
            evolution_cap: p.evolution_cap,
        };

        // Fetching and rendering block; keep them off the async runtime
        let response = tokio::task::spawn_blocking(move || {
            reports::generate_clinical_report(source.as_ref(), &layout, &output_dir, &request)
        })
        .await
        .map_err(|e| McpError::internal_error(format!("Report task failed: {}", e), None))?
        .map_err(report_error)?;

        self.status_tracker.lock().await.record_report();
        json_result(&response)
    }

    #[tool(description = "Preview the page layout of a patient's clinical report (page count, chart page, elements per page) without writing a file")]
    async fn preview_report_layout(
        &self,
        Parameters(p): Parameters<PreviewReportLayoutParams>,
    ) -> Result<CallToolResult, McpError> {
        let source = Arc::clone(&self.source);
        let layout = self.layout.clone();

        let preview = tokio::task::spawn_blocking(move || {
            reports::preview_report_layout(source.as_ref(), &layout, &p.patient_id)
        })
        .await
        .map_err(|e| McpError::internal_error(format!("Preview task failed: {}", e), None))?
        .map_err(report_error)?;

        json_result(&preview)
    }
}

#[tool_handler]
impl ServerHandler for MedaiService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "medai-report".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("MedAI Evolution Assistant - Report Service".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MedAI clinical evolution reports. \
                 Call report_instructions first if unsure. \
                 generate_clinical_report writes a PDF for a patient_id; \
                 preview_report_layout shows pagination without writing; \
                 medai_status reports build, data source and uptime."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let err = report_error(ReportError::MissingIdentifier);
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert_eq!(err.data, Some(serde_json::json!({ "status": 400 })));

        let err = report_error(ReportError::InvalidOutputPath("../x.pdf".into()));
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);

        let err = report_error(ReportError::PatientNotFound("P-9".into()));
        assert_eq!(err.code, rmcp::model::ErrorCode::RESOURCE_NOT_FOUND);

        let err = report_error(ReportError::composition("discharge.relapse_risk", "out of range"));
        assert_eq!(err.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("discharge.relapse_risk"));
    }
}
