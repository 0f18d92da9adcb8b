//! CLI contract tests
//!
//! Runs the built binary against a throwaway data directory and checks
//! stdout, JSON shapes and exit codes.

use std::path::Path;
use std::process::{Command, Output};

const TOPOLOGY: &str = r#"{
  "devices": [
    {"key": "r1", "hostname": "edge-1", "device_type": "router",
     "ports": [{"name": "g0", "role": {"mode": "routed", "address": {"ip": "10.0.0.1", "mask": "255.255.255.252"}}}]},
    {"key": "r2", "hostname": "edge-2", "device_type": "router",
     "ports": [{"name": "g0", "role": {"mode": "routed", "address": {"ip": "10.0.0.2", "mask": "255.255.255.252"}}}]},
    {"key": "h1", "hostname": "host-1", "device_type": "host"}
  ],
  "connections": [
    {"key": "c1", "from_device": "devices/r1", "src_port": "g0",
     "to_device": "devices/r2", "dst_port": "g0", "speed": "1G", "cable_type": "fiber"}
  ]
}"#;

fn netgraph(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_netgraph"))
        .args(args)
        .env("NETGRAPH_DATA_DIR", data_dir)
        .env_remove("NETGRAPH_DATABASE")
        .env_remove("NETGRAPH_ACTOR")
        .env_remove("RUST_LOG")
        // Keep any real user config out of the way
        .env("HOME", data_dir)
        .env("XDG_CONFIG_HOME", data_dir.join("config"))
        .output()
        .expect("run netgraph")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Data dir with database `lab` holding the test topology
fn seeded() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let out = netgraph(dir.path(), &["db", "create", "lab"]);
    assert!(out.status.success(), "db create failed: {:?}", out);

    let file = dir.path().join("topology.json");
    std::fs::write(&file, TOPOLOGY).unwrap();
    let out = netgraph(
        dir.path(),
        &["--database", "lab", "--format", "json", "save", file.to_str().unwrap()],
    );
    assert!(out.status.success(), "save failed: {:?}", out);
    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["devices_created"], 3);
    assert_eq!(summary["connections_created"], 1);
    dir
}

#[test]
fn test_db_list_shows_prefixed_names() {
    let dir = seeded();
    let out = netgraph(dir.path(), &["db", "list", "--format", "json"]);
    assert!(out.status.success());
    let names: Vec<String> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(names, vec!["netgraph_lab"]);
}

#[test]
fn test_paths_json() {
    let dir = seeded();
    let out = netgraph(dir.path(), &["-d", "lab", "paths", "r1", "r2", "--format", "json"]);
    assert!(out.status.success(), "{:?}", out);

    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["total_paths_found"], 1);
    assert_eq!(result["shortest_path"]["hops"], 1);
    assert_eq!(result["shortest_path"]["cost"], 5);
    assert_eq!(result["shortest_path"]["avg_cost"], 5.0);
    assert_eq!(result["alternative_paths"].as_array().unwrap().len(), 0);
}

#[test]
fn test_paths_text_without_route() {
    let dir = seeded();
    let out = netgraph(dir.path(), &["-d", "lab", "paths", "r1", "h1"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("No path between these devices"));
}

#[test]
fn test_missing_device_exits_with_two() {
    let dir = seeded();
    let out = netgraph(dir.path(), &["-d", "lab", "paths", "r1", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope"));

    let out = netgraph(dir.path(), &["-d", "lab", "delete-device", "nope"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_missing_database_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let out = netgraph(dir.path(), &["-d", "ghost", "stats"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_no_database_selected_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = netgraph(dir.path(), &["stats"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_delete_device_cascades() {
    let dir = seeded();
    let out = netgraph(dir.path(), &["-d", "lab", "-f", "json", "delete-device", "r1"]);
    assert!(out.status.success(), "{:?}", out);
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["removed_connections"][0], "c1");
    assert_eq!(report["repaired_ports"][0]["device"], "r2");

    let out = netgraph(dir.path(), &["-d", "lab", "show"]);
    let topology: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(topology["devices"].as_array().unwrap().len(), 2);
    assert!(topology["connections"].as_array().unwrap().is_empty());
    assert!(topology["devices"][0]["ports"][0]["role"].get("address").is_none());
}

#[test]
fn test_stats_json() {
    let dir = seeded();
    let out = netgraph(dir.path(), &["-d", "lab", "stats", "-f", "json"]);
    assert!(out.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(stats["overview"]["total_devices"], 3);
    assert_eq!(stats["overview"]["isolated_device_count"], 1);
    assert_eq!(stats["isolated_devices"][0]["key"], "h1");
}

#[test]
fn test_export_to_file() {
    let dir = seeded();
    let target = dir.path().join("export.json");
    let out = netgraph(
        dir.path(),
        &["-d", "lab", "export", "-o", target.to_str().unwrap()],
    );
    assert!(out.status.success());

    let devices: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    let r1 = &devices[0];
    assert_eq!(r1["key"], "r1");
    assert_eq!(r1["connections"][0]["neighbor_key"], "r2");
    assert_eq!(r1["connections"][0]["cable_type"], "fiber");
}

#[test]
fn test_export_to_stdout_follows_format() {
    let dir = seeded();
    let out = netgraph(dir.path(), &["-d", "lab", "-f", "json", "export"]);
    assert!(out.status.success());
    let devices: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(devices.as_array().unwrap().len(), 3);
    assert_eq!(devices[2]["connections"], serde_json::json!([]));

    let out = netgraph(dir.path(), &["-d", "lab", "export"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("g0 -> edge-2:g0"));
    assert!(text.contains("no connections"));
}

#[test]
fn test_audit_records_save() {
    let dir = seeded();
    let out = netgraph(
        dir.path(),
        &["-d", "lab", "audit", "--action", "bulk_save", "-f", "json"],
    );
    assert!(out.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["entity_type"], "topology");

    let out = netgraph(dir.path(), &["-d", "lab", "audit", "--action", "explode"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_cidr_needs_no_database() {
    let dir = tempfile::tempdir().unwrap();
    let out = netgraph(dir.path(), &["cidr", "192.168.1.77/24"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("192.168.1.0/24"));
    assert!(text.contains("192.168.1.1"));
    assert!(text.contains("192.168.1.2"));

    let out = netgraph(dir.path(), &["cidr", "not-an-address"]);
    assert_eq!(out.status.code(), Some(1));
}
