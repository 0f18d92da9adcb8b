//! Output reporters for netgraph results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::addressing::CidrBlock;
use crate::analysis::{DeviceProjection, NetworkStatistics, PathAnalysis};
use crate::audit::{AuditEntry, AuditStats};
use crate::repository::{CascadeReport, SaveSummary};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Anything the CLI prints
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report<'a> {
    Paths(&'a PathAnalysis),
    Statistics(&'a NetworkStatistics),
    Projection(&'a [DeviceProjection]),
    AuditEntries(&'a [AuditEntry]),
    AuditStats(&'a AuditStats),
    Cidr(&'a CidrBlock),
    Cascade(&'a CascadeReport),
    Saved(&'a SaveSummary),
    Databases(&'a [String]),
}

/// Render a report in the specified format
pub fn report(report: &Report<'_>, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(report, fmt)
}

/// Render a report using an OutputFormat enum
pub fn report_with_format(report: &Report<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render(report)),
        OutputFormat::Json => json::render(report),
    }
}
