//! Topology commands: save, show, cascade deletes, export

use super::Context;
use anyhow::{Context as _, Result};
use console::style;
use netgraph::graph::TopologyStore;
use netgraph::models::Topology;
use netgraph::reporters::Report;
use std::path::Path;

/// Replace the stored topology with the document in `file`
pub fn save(ctx: &Context, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let topology: Topology = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse topology in {}", file.display()))?;

    let session = ctx.session()?;
    let summary = session
        .repository()
        .replace_topology(topology)
        .with_context(|| format!("Failed to save topology to {}", session.name()))?;
    ctx.print(&Report::Saved(&summary))
}

/// Print the stored topology as a JSON document
pub fn show(ctx: &Context) -> Result<()> {
    let session = ctx.session()?;
    let snapshot = session.store().snapshot()?;
    let topology = Topology::new(snapshot.devices, snapshot.connections);
    println!("{}", serde_json::to_string_pretty(&topology)?);
    Ok(())
}

pub fn delete_device(ctx: &Context, key: &str) -> Result<()> {
    let session = ctx.session()?;
    let report = session.repository().delete_device(key)?;
    ctx.print(&Report::Cascade(&report))
}

pub fn delete_connection(ctx: &Context, key: &str) -> Result<()> {
    let session = ctx.session()?;
    let report = session.repository().delete_connection(key)?;
    ctx.print(&Report::Cascade(&report))
}

/// Print the port-connection projection, or write it to `output` as JSON
pub fn export(ctx: &Context, output: Option<&Path>) -> Result<()> {
    let session = ctx.session()?;
    let devices = session.projector().project()?;

    let Some(path) = output else {
        return ctx.print(&Report::Projection(&devices));
    };
    let json = serde_json::to_string_pretty(&devices)?;
    std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!(
        "{} Exported {} devices to {}",
        style("✓").green(),
        devices.len(),
        style(path.display()).cyan()
    );
    Ok(())
}
