//! Analysis commands: paths, stats, cidr

use super::Context;
use anyhow::{anyhow, Result};
use netgraph::addressing::CidrBlock;
use netgraph::reporters::Report;

pub fn paths(ctx: &Context, source: &str, target: &str) -> Result<()> {
    let session = ctx.session()?;
    let analysis = session.path_analyzer().analyze(source, target)?;
    ctx.print(&Report::Paths(&analysis))
}

pub fn stats(ctx: &Context) -> Result<()> {
    let session = ctx.session()?;
    let stats = session.aggregator().compute()?;
    ctx.print(&Report::Statistics(&stats))
}

/// Needs no database
pub fn cidr(ctx: &Context, block: &str) -> Result<()> {
    let block: CidrBlock = block.parse().map_err(|e: String| anyhow!(e))?;
    ctx.print(&Report::Cidr(&block))
}
