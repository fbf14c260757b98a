//! Compartment hierarchy listing.
//!
//! Walks the compartment tree breadth-first from a root (the tenancy by
//! default) and prints every `ACTIVE` compartment.
//!
//! # Usage
//!
//! ```bash
//! # Indented tree on stdout
//! oci-ops compartments --profile DEFAULT
//!
//! # Subtree as CSV
//! oci-ops compartments --profile ops --root ocid1.compartment.oc1..xxx \
//!     --format csv --output compartments.csv
//!
//! # Stop after the first 50 compartments
//! oci-ops compartments --profile ops --max-compartments 50
//! ```

use crate::oci_api::tree::WalkResult;
use crate::oci_api::{CompartmentNode, CompartmentWalker, OciClient};
use crate::utils::format::{format_number, indent};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CompartmentRow<'a> {
    depth: usize,
    name: &'a str,
    id: &'a str,
    parent_name: &'a str,
    parent_id: &'a str,
    lifecycle_state: String,
    description: &'a str,
}

impl<'a> From<&'a CompartmentNode> for CompartmentRow<'a> {
    fn from(node: &'a CompartmentNode) -> Self {
        Self {
            depth: node.depth,
            name: &node.compartment.name,
            id: &node.compartment.id,
            parent_name: node.parent_name.as_deref().unwrap_or_default(),
            parent_id: node.compartment.compartment_id.as_deref().unwrap_or_default(),
            lifecycle_state: node.compartment.lifecycle_state.to_string(),
            description: &node.compartment.description,
        }
    }
}

pub async fn run(
    config_file: Option<&str>,
    profile: &str,
    root: Option<&str>,
    max_compartments: usize,
    format: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    let format = format.unwrap_or("tree").to_lowercase();
    if !matches!(format.as_str(), "tree" | "json" | "csv") {
        bail!("Invalid format '{}'. Use 'tree', 'json' or 'csv'", format);
    }

    let (config, client) = OciClient::from_profile(config_file, profile)?;
    let root_id = root.unwrap_or(&config.tenancy);

    eprintln!("Walking compartments below {}...", root_id);
    let result = CompartmentWalker::new(&client)
        .with_max_visits(max_compartments)
        .walk(root_id)
        .await
        .with_context(|| format!("Failed to read root compartment {}", root_id))?;

    eprintln!(
        "Found {} compartments{}",
        format_number(result.nodes.len()),
        if result.truncated {
            " (limit reached)"
        } else {
            ""
        }
    );
    if !result.errors.is_empty() {
        eprintln!(
            "⚠️  {} compartments could not be listed",
            result.errors.len()
        );
    }

    match output {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("Failed to create output file: {}", path))?;
            write_result(&result, &format, file)?;
            eprintln!("Output written to: {}", path);
        }
        None => write_result(&result, &format, std::io::stdout().lock())?,
    }

    Ok(())
}

/// Render a walk as an indented tree, JSON array or CSV.
pub fn write_result<W: Write>(result: &WalkResult, format: &str, mut out: W) -> Result<()> {
    let rows: Vec<CompartmentRow> = result.nodes.iter().map(CompartmentRow::from).collect();

    match format {
        "json" => {
            serde_json::to_writer_pretty(&mut out, &rows)?;
            writeln!(out)?;
        }
        "csv" => {
            let mut writer = csv::Writer::from_writer(out);
            for row in &rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        _ => {
            for index in depth_first_order(&result.nodes) {
                let row = &rows[index];
                writeln!(out, "{}{} ({})", indent(row.depth), row.name, row.id)?;
            }
        }
    }

    Ok(())
}

/// Indices of `nodes` in pre-order, so every compartment follows its parent
/// and precedes its parent's next sibling. Sibling order is kept.
fn depth_first_order(nodes: &[CompartmentNode]) -> Vec<usize> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.compartment.id.as_str()).collect();
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut stack = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        match node.compartment.compartment_id.as_deref() {
            Some(parent) if index > 0 && ids.contains(parent) => {
                children.entry(parent).or_default().push(index);
            }
            _ => stack.push(index),
        }
    }
    stack.reverse();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(index) = stack.pop() {
        order.push(index);
        if let Some(kids) = children.get(nodes[index].compartment.id.as_str()) {
            stack.extend(kids.iter().rev());
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci_api::models::{Compartment, LifecycleState};

    fn sample() -> WalkResult {
        let node = |id: &str, parent: Option<(&str, &str)>, depth| CompartmentNode {
            compartment: Compartment {
                id: id.to_string(),
                name: id.to_uppercase(),
                description: String::new(),
                compartment_id: parent.map(|(pid, _)| pid.to_string()),
                lifecycle_state: LifecycleState::Active,
            },
            parent_name: parent.map(|(_, name)| name.to_string()),
            depth,
        };
        WalkResult {
            nodes: vec![
                node("root", None, 0),
                node("net", Some(("root", "ROOT")), 1),
                node("dmz", Some(("net", "NET")), 2),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_tree_output() {
        let mut out = Vec::new();
        write_result(&sample(), "tree", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ROOT (root)");
        assert!(lines[2].ends_with("DMZ (dmz)"));
        assert!(lines[2].len() > lines[1].len());
    }

    #[test]
    fn test_tree_output_nests_under_own_parent() {
        let node = |id: &str, parent: Option<&str>, depth| CompartmentNode {
            compartment: Compartment {
                id: id.to_string(),
                name: id.to_uppercase(),
                description: String::new(),
                compartment_id: parent.map(str::to_string),
                lifecycle_state: LifecycleState::Active,
            },
            parent_name: parent.map(str::to_uppercase),
            depth,
        };
        // Walk order is breadth-first.
        let result = WalkResult {
            nodes: vec![
                node("root", None, 0),
                node("a", Some("root"), 1),
                node("b", Some("root"), 1),
                node("a1", Some("a"), 2),
                node("b1", Some("b"), 2),
            ],
            ..Default::default()
        };

        let mut out = Vec::new();
        write_result(&result, "tree", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ROOT (root)",
                "  A (a)",
                "    A1 (a1)",
                "  B (b)",
                "    B1 (b1)",
            ]
        );

        // CSV keeps the walk order.
        let mut out = Vec::new();
        write_result(&result, "csv", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(3), Some("1,B,b,ROOT,root,ACTIVE,"));
    }

    #[test]
    fn test_csv_output() {
        let mut out = Vec::new();
        write_result(&sample(), "csv", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("depth,name,id,parent_name,parent_id,lifecycle_state,description")
        );
        assert_eq!(lines.nth(1), Some("1,NET,net,ROOT,root,ACTIVE,"));
    }

    #[test]
    fn test_json_output() {
        let mut out = Vec::new();
        write_result(&sample(), "json", &mut out).unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["parent_name"], "NET");
    }
}
