//! MedAI tools module
//!
//! Tool implementations behind the MCP server and the CLI binaries.

pub mod reports;
pub mod status;
