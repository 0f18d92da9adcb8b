//! netgraph - network topology graph engine CLI

mod cli;

use clap::Parser;
use console::style;
use netgraph::TopologyError;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            exit_code(&err)
        }
    }
}

/// 2 for a missing device, connection or database, 1 for anything else
fn exit_code(err: &anyhow::Error) -> ExitCode {
    let not_found = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<TopologyError>())
        .any(TopologyError::is_not_found);
    if not_found {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}
