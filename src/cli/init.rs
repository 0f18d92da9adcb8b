//! Init command - write the example user config

use anyhow::{Context, Result};
use console::style;
use netgraph::config::NetgraphConfig;

/// Run the init command
pub fn run() -> Result<()> {
    let path = NetgraphConfig::init_user_config().context("Failed to write user config")?;
    println!(
        "{} Config at {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
    println!("  Edit it to set a default database, data directory or audit actor.");
    Ok(())
}
