//! Audit log queries

use super::Context;
use anyhow::{anyhow, Result};
use netgraph::audit::{AuditAction, AuditEntity, AuditFilter};
use netgraph::reporters::Report;

pub fn run(
    ctx: &Context,
    limit: Option<usize>,
    action: Option<&str>,
    entity_type: Option<&str>,
    stats: bool,
) -> Result<()> {
    let session = ctx.session()?;
    let log = session.audit_log();

    if stats {
        let stats = log.stats()?;
        return ctx.print(&Report::AuditStats(&stats));
    }

    let filter = AuditFilter {
        limit,
        action: action
            .map(|a| a.parse::<AuditAction>())
            .transpose()
            .map_err(|e| anyhow!(e))?,
        entity_type: entity_type
            .map(|t| t.parse::<AuditEntity>())
            .transpose()
            .map_err(|e| anyhow!(e))?,
    };
    let entries = log.entries(&filter)?;
    ctx.print(&Report::AuditEntries(&entries))
}
