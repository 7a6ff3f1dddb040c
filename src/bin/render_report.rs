//! One-shot report generation
//!
//! Usage: render_report <patient_id> [output]

use std::path::PathBuf;

use medai_report::config::ServiceConfig;
use medai_report::source;
use medai_report::tools::reports::{generate_clinical_report, ReportRequest};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("medai_report=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(patient_id) = args.next() else {
        eprintln!("Usage: render_report <patient_id> [output]");
        std::process::exit(2);
    };

    let config = ServiceConfig::from_env()?;
    let source = source::from_config(&config)?;

    // A CLI path names its own directory; the service only sees the file name
    let mut output_dir = config.output_dir.clone();
    let mut output_path = None;
    if let Some(arg) = args.next().map(PathBuf::from) {
        match (arg.parent(), arg.file_name()) {
            (Some(parent), Some(name)) => {
                if !parent.as_os_str().is_empty() {
                    output_dir = parent.to_path_buf();
                }
                output_path = Some(PathBuf::from(name));
            }
            _ => output_path = Some(arg),
        }
    }

    let request = ReportRequest {
        output_path,
        ..ReportRequest::new(patient_id)
    };

    match generate_clinical_report(source.as_ref(), &config.layout, &output_dir, &request) {
        Ok(response) => {
            println!("{}", response.message);
            println!("Written to {}", response.file_path);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.status_code(), e);
            std::process::exit(1);
        }
    }
}
