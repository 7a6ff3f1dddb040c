//! MedAI Evolution Assistant - report service library
//!
//! Builds paginated clinical evolution PDF reports from a patient's records.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod report;
pub mod source;
pub mod tools;
