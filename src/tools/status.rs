//! Service status tool
//!
//! Runtime status of the report service plus usage instructions for
//! assistants calling it.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Report generation instructions for AI assistants
pub const REPORT_INSTRUCTIONS: &str = r#"
# MedAI Report Instructions

## Generating a report

Call `generate_clinical_report` with the patient identifier:

```
generate_clinical_report(patient_id: "P-100")
```

The PDF is written to the configured output directory as
`clinical_report_<patient_id>.pdf` unless `output_path` is given. Characters
other than letters, digits and `-` in the identifier are written as `_XX` hex
(`a/b` becomes `a_2Fb`). `output_path` is resolved against the output
directory and must stay inside it: absolute paths and `..` are refused with
status 400.

Optional display caps:
- `treatment_cap`: how many treatments to list (first N, default 8)
- `evolution_cap`: how many assessments to list (last N, default 5)

## Checking the layout first

`preview_report_layout(patient_id: "P-100")` returns the page count, the page
holding the chart and the number of elements per page. No file is written.

## Errors

- 400: the patient identifier is missing or blank
- 404: no patient with that identifier
- 500: the patient's records are incomplete or malformed, or the data source
  failed. The message names the offending field.

## Notes

- Relapse risk is stored as a fraction (0.125) and printed as a percentage
  (12.5%).
- Missing values print as "-".
- The chart is skipped, not fatal, if it cannot be drawn.
"#;

/// Runtime status of the report service
#[derive(Debug, Clone, Serialize)]
pub struct MedaiStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Data source information
    pub source: &'static str,
    pub database_path: Option<String>,
    pub database_size_bytes: Option<u64>,
    pub output_dir: String,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
    pub reports_generated: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    source: &'static str,
    database_path: Option<PathBuf>,
    output_dir: PathBuf,
    reports_generated: u64,
}

impl StatusTracker {
    /// `database_path` is `None` when records come from the REST source
    pub fn new(source: &'static str, database_path: Option<PathBuf>, output_dir: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            source,
            database_path,
            output_dir,
            reports_generated: 0,
        }
    }

    pub fn record_report(&mut self) {
        self.reports_generated += 1;
    }

    /// Get the current status
    pub fn get_status(&self) -> MedaiStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = self
            .database_path
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|m| m.len());

        // Get process info
        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        MedaiStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            source: self.source,
            database_path: self.database_path.as_ref().map(|p| p.display().to_string()),
            database_size_bytes,
            output_dir: self.output_dir.display().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
            reports_generated: self.reports_generated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_reports() {
        let mut tracker = StatusTracker::new("rest", None, PathBuf::from("/tmp"));
        tracker.record_report();
        tracker.record_report();

        let status = tracker.get_status();
        assert_eq!(status.source, "rest");
        assert_eq!(status.reports_generated, 2);
        assert!(status.database_path.is_none());
        assert!(status.database_size_bytes.is_none());
        assert_eq!(status.process_id, std::process::id());
    }

    #[test]
    fn test_status_reports_database_size() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"0123456789").unwrap();
        let tracker = StatusTracker::new("sqlite", Some(file.path().to_path_buf()), PathBuf::from("."));
        assert_eq!(tracker.get_status().database_size_bytes, Some(10));
    }
}
