//! Database management commands

use super::Context;
use anyhow::{Context as _, Result};
use console::style;
use netgraph::reporters::{OutputFormat, Report};

pub fn list(ctx: &Context) -> Result<()> {
    let workspace = ctx.workspace();
    let names = workspace
        .list_databases()
        .with_context(|| format!("Failed to list databases in {}", workspace.root().display()))?;
    ctx.print(&Report::Databases(&names))
}

pub fn create(ctx: &Context, name: &str) -> Result<()> {
    let session = ctx.workspace().create_database(name)?;
    match ctx.format() {
        OutputFormat::Json => println!("{}", serde_json::json!({ "created": session.name() })),
        OutputFormat::Text => println!(
            "{} Database {} ready",
            style("✓").green(),
            style(session.name()).cyan()
        ),
    }
    Ok(())
}

pub fn delete(ctx: &Context, name: &str) -> Result<()> {
    let deleted = ctx.workspace().delete_database(name)?;
    match ctx.format() {
        OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": deleted })),
        OutputFormat::Text => println!(
            "{} Deleted database {}",
            style("✓").green(),
            style(&deleted).cyan()
        ),
    }
    Ok(())
}
