//! MedAI Evolution Assistant - report service
//!
//! An MCP server generating clinical evolution reports.

use std::sync::Arc;

use medai_report::config::{ServiceConfig, SourceKind};
use medai_report::mcp::MedaiService;
use medai_report::{build_info, source};
use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("medai_report=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let config = ServiceConfig::from_env()?;
    eprintln!("Data source: {}", config.source.as_str());
    match &config.source {
        SourceKind::Sqlite => eprintln!("Database path: {}", config.database_path.display()),
        SourceKind::Rest { base_url, timeout_secs } => {
            eprintln!("REST source: {} (timeout {}s)", base_url, timeout_secs)
        }
    }
    eprintln!("Output directory: {}", config.output_dir.display());

    // Opens and migrates the database for the SQLite source
    let source: Arc<dyn source::ClinicalSource> = Arc::from(source::from_config(&config)?);

    let service = MedaiService::new(&config, source);

    // Create stdio transport
    let transport = (stdin(), stdout());

    // Start the MCP server
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}
