//! JSON reporter
//!
//! Pretty-printed JSON of the underlying result, for piping to jq or
//! handing to another tool.

use super::Report;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: &Report<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::CidrBlock;
    use crate::reporters::tests::test_analysis;

    #[test]
    fn test_json_render_paths() {
        let analysis = test_analysis();
        let json_str = render(&Report::Paths(&analysis)).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");

        assert_eq!(parsed["source"]["key"], "a");
        assert_eq!(parsed["shortest_path"]["hops"], 1);
        assert_eq!(parsed["shortest_path"]["cost"], 20);
        assert_eq!(parsed["cheapest_path"]["cost"], 20);
        assert_eq!(parsed["shortest_path"]["connections"][0]["speed"], "10M");
        assert_eq!(parsed["path_limit_reached"], false);
    }

    #[test]
    fn test_json_render_is_untagged() {
        let block: CidrBlock = "192.168.1.77/24".parse().unwrap();
        let json_str = render(&Report::Cidr(&block)).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        assert_eq!(parsed["network"], "192.168.1.0");
        assert_eq!(parsed["first_host"], "192.168.1.1");
    }

    #[test]
    fn test_json_empty_list() {
        let names: Vec<String> = Vec::new();
        let json_str = render(&Report::Databases(&names)).expect("render JSON");
        assert_eq!(json_str.trim(), "[]");
    }
}
