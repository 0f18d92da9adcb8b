//! CLI command definitions and handlers

mod analyze;
mod audit;
mod db;
mod init;
mod topology;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use netgraph::config::NetgraphConfig;
use netgraph::reporters::{self, OutputFormat, Report};
use netgraph::session::{Session, Workspace};
use std::path::PathBuf;

/// netgraph - Network topology graph engine
///
/// Stores device/connection topologies in named local databases and
/// answers path, connectivity and port-wiring questions about them.
#[derive(Parser, Debug)]
#[command(name = "netgraph")]
#[command(
    version,
    about = "Network topology graph engine: save topologies, find paths, summarize connectivity",
    after_help = "\
Examples:
  netgraph db create lab                      Create a database
  netgraph --database lab save topo.json      Replace the stored topology
  netgraph --database lab paths r1 r4         Shortest, cheapest and alternative paths
  netgraph --database lab stats --format json Connectivity statistics as JSON
  netgraph cidr 10.0.12.77/22                 CIDR calculator"
)]
pub struct Cli {
    /// Directory holding the databases (default: platform data dir)
    #[arg(long, global = true, env = "NETGRAPH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Database to operate on
    #[arg(long, short = 'd', global = true)]
    pub database: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Output format: text, json
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example user config (~/.config/netgraph/config.toml)
    Init,

    /// Manage databases
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Replace the stored topology with a JSON document
    #[command(after_help = "\
The file holds {\"devices\": [...], \"connections\": [...]}. Everything
previously stored in the database is discarded.")]
    Save {
        /// Topology JSON file
        file: PathBuf,
    },

    /// Print the stored topology as JSON
    Show,

    /// Delete a device, its connections, and repair neighbor ports
    DeleteDevice {
        /// Device key
        key: String,
    },

    /// Delete a connection and clear the addresses on both ends
    DeleteConnection {
        /// Connection key
        key: String,
    },

    /// Find paths between two devices
    #[command(after_help = "\
Examples:
  netgraph paths r1 r4                 Shortest, cheapest and alternatives
  netgraph paths r1 r4 --format json   Full result as JSON")]
    Paths {
        /// Source device key
        source: String,

        /// Target device key
        target: String,
    },

    /// Connectivity statistics for the stored topology
    Stats,

    /// Devices with their resolved port connections. Files are always JSON
    Export {
        /// Write JSON to this file instead of printing in --format
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Query the audit log
    #[command(after_help = "\
Examples:
  netgraph audit --limit 20
  netgraph audit --action delete --entity-type device
  netgraph audit --stats")]
    Audit {
        /// Maximum entries to show (default 100, max 1000)
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Only entries with this action (create, update, delete, bulk_save)
        #[arg(long)]
        action: Option<String>,

        /// Only entries for this entity type (device, connection, topology)
        #[arg(long)]
        entity_type: Option<String>,

        /// Show counts by action and entity type instead of entries
        #[arg(long)]
        stats: bool,
    },

    /// CIDR calculator: network, first and second host
    Cidr {
        /// Address with prefix length, e.g. 192.168.1.77/24
        block: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbAction {
    /// List databases
    List,

    /// Create a database (no-op if it exists)
    Create {
        /// Database name; `netgraph_` is prepended if missing
        name: String,
    },

    /// Delete a database and everything in it
    Delete {
        /// Database name
        name: String,
    },
}

/// Resolved settings shared by every handler
pub(crate) struct Context {
    config: NetgraphConfig,
    format: OutputFormat,
}

impl Context {
    fn new(cli: &Cli) -> Result<Self> {
        let config = NetgraphConfig::load()?.with_overrides(cli.data_dir.clone(), cli.database.clone());
        let format = cli.format.parse()?;
        Ok(Self { config, format })
    }

    pub(crate) fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a report to stdout in the selected format
    pub(crate) fn print(&self, report: &Report<'_>) -> Result<()> {
        let rendered = reporters::report_with_format(report, self.format)?;
        println!("{}", rendered);
        Ok(())
    }

    pub(crate) fn workspace(&self) -> Workspace {
        Workspace::new(self.config.data_dir())
    }

    /// Open the selected database
    pub(crate) fn session(&self) -> Result<Session> {
        let Some(name) = self.config.database() else {
            bail!("No database selected. Pass --database NAME or set NETGRAPH_DATABASE");
        };
        let session = self.workspace().connect(name)?;
        Ok(session.with_actor(self.config.actor()))
    }
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Init => init::run(),

        Commands::Db { action } => match action {
            DbAction::List => db::list(&ctx),
            DbAction::Create { name } => db::create(&ctx, &name),
            DbAction::Delete { name } => db::delete(&ctx, &name),
        },

        Commands::Save { file } => topology::save(&ctx, &file),
        Commands::Show => topology::show(&ctx),
        Commands::DeleteDevice { key } => topology::delete_device(&ctx, &key),
        Commands::DeleteConnection { key } => topology::delete_connection(&ctx, &key),
        Commands::Export { output } => topology::export(&ctx, output.as_deref()),

        Commands::Paths { source, target } => analyze::paths(&ctx, &source, &target),
        Commands::Stats => analyze::stats(&ctx),
        Commands::Cidr { block } => analyze::cidr(&ctx, &block),

        Commands::Audit {
            limit,
            action,
            entity_type,
            stats,
        } => audit::run(&ctx, limit, action.as_deref(), entity_type.as_deref(), stats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths_with_globals() {
        let cli = Cli::try_parse_from([
            "netgraph", "paths", "r1", "r2", "--database", "lab", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.database.as_deref(), Some("lab"));
        assert_eq!(cli.format, "json");
        assert!(matches!(
            cli.command,
            Commands::Paths { ref source, ref target } if source == "r1" && target == "r2"
        ));
    }

    #[test]
    fn test_log_level_default_and_validation() {
        let cli = Cli::try_parse_from(["netgraph", "stats"]).unwrap();
        assert_eq!(cli.log_level, "warn");
        assert!(Cli::try_parse_from(["netgraph", "--log-level", "loud", "stats"]).is_err());
    }

    #[test]
    fn test_parse_db_and_audit() {
        let cli = Cli::try_parse_from(["netgraph", "db", "create", "lab"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Db { action: DbAction::Create { ref name } } if name == "lab"
        ));

        let cli = Cli::try_parse_from([
            "netgraph", "audit", "-n", "5", "--action", "delete", "--stats",
        ])
        .unwrap();
        match cli.command {
            Commands::Audit {
                limit,
                action,
                stats,
                ..
            } => {
                assert_eq!(limit, Some(5));
                assert_eq!(action.as_deref(), Some("delete"));
                assert!(stats);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_format_rejected_by_parser() {
        assert!(Cli::try_parse_from(["netgraph", "--format", "sarif", "stats"]).is_err());
    }
}
