#![deny(warnings)]

//! Export surface: JSON documents of projection histories.
//!
//! The monthly export is a bare array of points with exactly the fields
//! `month, users, revenue, subscriptionRevenue, serviceFeeRevenue, costs, profit`.

use anyhow::{Context, Result};
use sim_core::{AnnualPoint, ProjectionPoint};
use std::fs;
use std::path::Path;
use tracing::info;

/// Serialize a monthly history as a pretty-printed JSON array.
pub fn export_history_json(history: &[ProjectionPoint]) -> Result<String> {
    serde_json::to_string_pretty(history).context("failed to serialize history")
}

/// Serialize an annual roll-up as a pretty-printed JSON array.
pub fn export_annual_json(annual: &[AnnualPoint]) -> Result<String> {
    serde_json::to_string_pretty(annual).context("failed to serialize annual roll-up")
}

/// Parse a document produced by [`export_history_json`].
pub fn parse_history_json(text: &str) -> Result<Vec<ProjectionPoint>> {
    serde_json::from_str(text).context("not a projection history document")
}

/// Write a monthly history to `path`, creating parent directories.
pub fn write_history_json(path: &Path, history: &[ProjectionPoint]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = export_history_json(history)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), points = history.len(), "history exported");
    Ok(())
}

/// File name offered for a download of the run named `name`.
pub fn export_file_name(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "backtest.json".to_string()
    } else {
        format!("backtest-{slug}.json")
    }
}
