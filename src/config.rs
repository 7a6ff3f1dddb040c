//! Service configuration
//!
//! Everything is read from `MEDAI_*` environment variables once at startup.
//! Layout values are PDF points (1/72 inch), measured from the page bottom.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} is required when MEDAI_SOURCE=rest")]
    Missing(&'static str),

    #[error("Invalid layout: {0}")]
    Layout(String),
}

/// Page geometry, pagination thresholds and display caps for the composer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    /// Lowest baseline content may use; crossing it triggers a page break
    pub bottom_margin: f32,
    /// Baseline of the footer line on the last page
    pub footer_offset: f32,
    pub line_height: f32,
    pub max_chars_per_line: usize,
    /// Display width of the chart before aspect-ratio scaling
    pub chart_width: f32,
    /// First N treatments shown
    pub treatment_cap: usize,
    /// Last M evolution assessments shown
    pub evolution_cap: usize,
    /// Last K observations shown
    pub observation_cap: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        // A4 with 2 cm side margins
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin_left: 56.69,
            margin_right: 56.69,
            margin_top: 56.69,
            bottom_margin: 120.0,
            footer_offset: 60.0,
            line_height: 14.0,
            max_chars_per_line: 90,
            chart_width: 425.2,
            treatment_cap: 8,
            evolution_cap: 5,
            observation_cap: 5,
        }
    }
}

impl LayoutConfig {
    /// Width available between the side margins
    pub fn content_width(&self) -> f32 {
        self.page_width - self.margin_left - self.margin_right
    }

    /// Baseline of the first line on a fresh page
    pub fn top(&self) -> f32 {
        self.page_height - self.margin_top
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_height <= 0.0 {
            return Err(ConfigError::Layout("line height must be positive".into()));
        }
        if self.max_chars_per_line == 0 {
            return Err(ConfigError::Layout("max chars per line must be positive".into()));
        }
        if self.content_width() <= 0.0 {
            return Err(ConfigError::Layout("side margins leave no content width".into()));
        }
        if self.footer_offset >= self.bottom_margin {
            return Err(ConfigError::Layout(format!(
                "footer offset {} must sit below bottom margin {}",
                self.footer_offset, self.bottom_margin
            )));
        }
        // Room for the continuation header plus a few lines on every page
        if self.top() - self.bottom_margin < self.line_height * 6.0 {
            return Err(ConfigError::Layout(format!(
                "top margin {} leaves too little room above bottom margin {}",
                self.margin_top, self.bottom_margin
            )));
        }
        Ok(())
    }

    /// Apply `MEDAI_*` layout overrides on top of the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut layout = Self::default();
        if let Some(v) = env_parse("MEDAI_MAX_CHARS_PER_LINE")? {
            layout.max_chars_per_line = v;
        }
        if let Some(v) = env_parse("MEDAI_LINE_HEIGHT")? {
            layout.line_height = v;
        }
        if let Some(v) = env_parse("MEDAI_BOTTOM_MARGIN")? {
            layout.bottom_margin = v;
        }
        if let Some(v) = env_parse("MEDAI_TREATMENT_CAP")? {
            layout.treatment_cap = v;
        }
        if let Some(v) = env_parse("MEDAI_EVOLUTION_CAP")? {
            layout.evolution_cap = v;
        }
        if let Some(v) = env_parse("MEDAI_OBSERVATION_CAP")? {
            layout.observation_cap = v;
        }
        layout.validate()?;
        Ok(layout)
    }
}

/// Where clinical records come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sqlite,
    Rest { base_url: String, timeout_secs: u64 },
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Sqlite => "sqlite",
            SourceKind::Rest { .. } => "rest",
        }
    }
}

/// Runtime configuration for the server and CLI binaries
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub source: SourceKind,
    pub output_dir: PathBuf,
    pub layout: LayoutConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = match std::env::var("MEDAI_SOURCE").ok().as_deref() {
            None | Some("") | Some("sqlite") => SourceKind::Sqlite,
            Some("rest") => SourceKind::Rest {
                base_url: std::env::var("MEDAI_REST_BASE_URL")
                    .map_err(|_| ConfigError::Missing("MEDAI_REST_BASE_URL"))?
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: env_parse("MEDAI_REST_TIMEOUT_SECS")?.unwrap_or(10),
            },
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "MEDAI_SOURCE",
                    value: other.to_string(),
                })
            }
        };

        let output_dir = std::env::var("MEDAI_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        Ok(Self {
            database_path: default_database_path(),
            source,
            output_dir,
            layout: LayoutConfig::from_env()?,
        })
    }
}

/// Get the database path from environment or use `<project>/data/medai.db`
pub fn default_database_path() -> PathBuf {
    std::env::var("MEDAI_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
                    path = grandparent.to_path_buf();
                }
            }

            path.push("data");
            path.push("medai.db");
            path
        })
}

fn env_parse<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let layout = LayoutConfig::default();
        layout.validate().unwrap();
        assert!(layout.content_width() > layout.chart_width);
    }

    #[test]
    fn test_source_kind_names() {
        assert_eq!(SourceKind::Sqlite.as_str(), "sqlite");
        let rest = SourceKind::Rest {
            base_url: "http://localhost:8080".into(),
            timeout_secs: 10,
        };
        assert_eq!(rest.as_str(), "rest");
    }

    #[test]
    fn test_footer_must_sit_below_bottom_margin() {
        let layout = LayoutConfig {
            footer_offset: 130.0,
            ..Default::default()
        };
        assert!(matches!(layout.validate(), Err(ConfigError::Layout(_))));
    }

    #[test]
    fn test_zero_width_rejected() {
        let layout = LayoutConfig {
            max_chars_per_line: 0,
            ..Default::default()
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_partial_layout_deserializes_with_defaults() {
        let layout: LayoutConfig = serde_json::from_str(r#"{"treatment_cap": 3}"#).unwrap();
        assert_eq!(layout.treatment_cap, 3);
        assert_eq!(layout.evolution_cap, LayoutConfig::default().evolution_cap);
    }
}
