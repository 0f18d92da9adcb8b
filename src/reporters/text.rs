//! Text (terminal) reporter with colors and formatting

use super::Report;
use crate::addressing::CidrBlock;
use crate::analysis::{DeviceProjection, NetworkStatistics, PathAnalysis, PathReport};
use crate::audit::{AuditEntry, AuditStats};
use crate::repository::{CascadeReport, SaveSummary};
use std::fmt::Write;

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";

const RULE: &str = "──────────────────────────────────────";

/// Render report as formatted terminal output
pub fn render(report: &Report<'_>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = match report {
        Report::Paths(analysis) => render_paths(&mut out, analysis),
        Report::Statistics(stats) => render_statistics(&mut out, stats),
        Report::Projection(devices) => render_projection(&mut out, devices),
        Report::AuditEntries(entries) => render_audit_entries(&mut out, entries),
        Report::AuditStats(stats) => render_audit_stats(&mut out, stats),
        Report::Cidr(block) => render_cidr(&mut out, block),
        Report::Cascade(cascade) => render_cascade(&mut out, cascade),
        Report::Saved(summary) => render_saved(&mut out, summary),
        Report::Databases(names) => render_databases(&mut out, names),
    };
    out
}

fn header(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out, "\n{BOLD}{title}{RESET}")?;
    writeln!(out, "{DIM}{RULE}{RESET}")
}

fn render_paths(out: &mut String, analysis: &PathAnalysis) -> std::fmt::Result {
    header(
        out,
        &format!(
            "Paths {} -> {}",
            analysis.source.hostname, analysis.target.hostname
        ),
    )?;
    writeln!(out, "Paths found: {}", analysis.total_paths_found)?;

    match (&analysis.shortest_path, &analysis.cheapest_path) {
        (Some(shortest), Some(cheapest)) => {
            writeln!(out, "\n{GREEN}{BOLD}SHORTEST{RESET}")?;
            render_path(out, shortest)?;
            writeln!(out, "\n{RED}{BOLD}CHEAPEST{RESET}")?;
            render_path(out, cheapest)?;
        }
        _ => writeln!(out, "{DIM}No path between these devices{RESET}")?,
    }

    if !analysis.alternative_paths.is_empty() {
        writeln!(
            out,
            "\n{YELLOW}{BOLD}ALTERNATIVES{RESET} ({})",
            analysis.alternative_paths.len()
        )?;
        for path in &analysis.alternative_paths {
            render_path(out, path)?;
        }
    }

    if analysis.path_limit_reached {
        writeln!(out, "\n{YELLOW}Path limit reached: more paths may exist{RESET}")?;
    }
    if analysis.depth_limit_reached {
        writeln!(out, "{YELLOW}Hop limit reached: longer paths were not explored{RESET}")?;
    }
    Ok(())
}

fn render_path(out: &mut String, path: &PathReport) -> std::fmt::Result {
    let route: Vec<&str> = path.devices.iter().map(|d| d.hostname.as_str()).collect();
    writeln!(
        out,
        "  {}  {DIM}hops {}  cost {}  avg {:.2}{RESET}",
        route.join(" -> "),
        path.hops,
        path.cost,
        path.avg_cost
    )?;
    for link in &path.connections {
        writeln!(
            out,
            "    {DIM}{}:{} <-> {}:{}  {} {}{RESET}",
            link.from_hostname,
            link.src_port,
            link.to_hostname,
            link.dst_port,
            link.speed,
            link.cable_type
        )?;
    }
    Ok(())
}

fn render_statistics(out: &mut String, stats: &NetworkStatistics) -> std::fmt::Result {
    let o = &stats.overview;
    header(out, "Network Statistics")?;
    writeln!(
        out,
        "Devices: {}  Connections: {}  Avg connections/device: {:.2}  Isolated: {}",
        o.total_devices, o.total_connections, o.average_connections_per_device, o.isolated_device_count
    )?;

    if !stats.devices_by_type.is_empty() {
        writeln!(out, "\n{BOLD}DEVICES BY TYPE{RESET}")?;
        for t in &stats.devices_by_type {
            writeln!(out, "  {:<12} {}", t.device_type, t.count)?;
        }
    }
    if !stats.connections_by_cable_type.is_empty() {
        writeln!(out, "\n{BOLD}CONNECTIONS BY CABLE{RESET}")?;
        for c in &stats.connections_by_cable_type {
            writeln!(out, "  {:<12} {}", c.cable_type, c.count)?;
        }
    }
    if !stats.most_connected_devices.is_empty() {
        writeln!(out, "\n{BOLD}MOST CONNECTED{RESET}")?;
        for d in &stats.most_connected_devices {
            writeln!(
                out,
                "  {:<20} {:<10} {}",
                d.hostname, d.device_type, d.connection_count
            )?;
        }
    }
    if !stats.isolated_devices.is_empty() {
        writeln!(out, "\n{BOLD}ISOLATED{RESET}")?;
        for d in &stats.isolated_devices {
            writeln!(out, "  {} ({}, {})", d.hostname, d.key, d.device_type)?;
        }
    }
    if !stats.port_statistics.is_empty() {
        writeln!(out, "\n{BOLD}PORTS{RESET}")?;
        for p in &stats.port_statistics {
            writeln!(
                out,
                "  {:<12} {} ports on {} devices (avg {:.1})",
                p.device_type, p.total_ports, p.device_count, p.average_ports_per_device
            )?;
        }
    }
    if !stats.vlan_statistics.is_empty() {
        writeln!(out, "\n{BOLD}VLANS{RESET}")?;
        for v in &stats.vlan_statistics {
            writeln!(
                out,
                "  {:<12} {} VLANs on {} devices",
                v.device_type, v.total_vlans, v.devices_with_vlans
            )?;
        }
    }
    if !stats.route_statistics.is_empty() {
        writeln!(out, "\n{BOLD}STATIC ROUTES{RESET}")?;
        for r in &stats.route_statistics {
            writeln!(
                out,
                "  {:<12} {} routes on {} devices",
                r.device_type, r.total_routes, r.devices_with_routes
            )?;
        }
    }
    Ok(())
}

fn render_projection(out: &mut String, devices: &[DeviceProjection]) -> std::fmt::Result {
    header(out, "Port Connections")?;
    for device in devices {
        writeln!(out, "{BOLD}{}{RESET} ({})", device.hostname, device.device_type)?;
        if let Some(router_id) = device.router_id {
            writeln!(out, "  {DIM}router-id {}{RESET}", router_id)?;
        }
        if !device.vlans.is_empty() || !device.subnets.is_empty() || !device.static_routes.is_empty() {
            writeln!(
                out,
                "  {DIM}{} VLANs, {} subnets, {} static routes{RESET}",
                device.vlans.len(),
                device.subnets.len(),
                device.static_routes.len()
            )?;
        }
        if device.connections.is_empty() {
            writeln!(out, "  {DIM}no connections{RESET}")?;
        }
        for link in &device.connections {
            writeln!(
                out,
                "  {} -> {}:{}",
                link.my_port, link.neighbor_hostname, link.neighbor_port
            )?;
        }
    }
    Ok(())
}

fn render_audit_entries(out: &mut String, entries: &[AuditEntry]) -> std::fmt::Result {
    header(out, "Audit Log")?;
    if entries.is_empty() {
        return writeln!(out, "{DIM}No entries{RESET}");
    }
    for e in entries {
        writeln!(
            out,
            "{DIM}{}{RESET}  {:<9} {:<10} {}  {DIM}by {}{RESET}",
            e.timestamp.format("%Y-%m-%d %H:%M:%S"),
            e.action,
            e.entity_type,
            e.entity_id,
            e.user
        )?;
    }
    Ok(())
}

fn render_audit_stats(out: &mut String, stats: &AuditStats) -> std::fmt::Result {
    header(out, "Audit Summary")?;
    writeln!(out, "Total entries: {}", stats.total)?;
    for (action, count) in &stats.by_action {
        writeln!(out, "  {:<10} {}", action, count)?;
    }
    for (entity, count) in &stats.by_entity_type {
        writeln!(out, "  {:<10} {}", entity, count)?;
    }
    if !stats.recent.is_empty() {
        render_audit_entries(out, &stats.recent)?;
    }
    Ok(())
}

fn render_cidr(out: &mut String, block: &CidrBlock) -> std::fmt::Result {
    writeln!(out, "Network:     {}/{}", block.network, block.prefix)?;
    writeln!(out, "Mask:        {}", block.mask())?;
    writeln!(out, "First host:  {}", block.first_host)?;
    writeln!(out, "Second host: {}", block.second_host)
}

fn render_cascade(out: &mut String, cascade: &CascadeReport) -> std::fmt::Result {
    writeln!(out, "Deleted {} {}", cascade.entity, cascade.key)?;
    for key in &cascade.removed_connections {
        writeln!(out, "  removed connection {}", key)?;
    }
    for port in &cascade.repaired_ports {
        writeln!(
            out,
            "  cleared {}/{} on {}",
            port.cleared.ip,
            port.cleared.prefix_len().unwrap_or(0),
            port_label(&port.device, &port.port)
        )?;
    }
    Ok(())
}

fn port_label(device: &str, port: &str) -> String {
    format!("{}:{}", device, port)
}

fn render_saved(out: &mut String, summary: &SaveSummary) -> std::fmt::Result {
    writeln!(
        out,
        "Saved {} devices ({} new) and {} connections ({} new)",
        summary.devices_created,
        summary.new_device_keys.len(),
        summary.connections_created,
        summary.new_connection_keys.len()
    )
}

fn render_databases(out: &mut String, names: &[String]) -> std::fmt::Result {
    if names.is_empty() {
        return writeln!(out, "{DIM}No databases{RESET}");
    }
    for name in names {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}
