//! Text rendering of trees and diffs.

use std::collections::HashSet;
use std::fmt::Write;

use clap::ValueEnum;

use cachenet_console::{ApplicationWorkbench, NodeWorkbench};
use cachenet_topology::{InstallStatus, InstallationDiff, NodeId, NodeStatus, TopologyDiff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Draw a forest with box-drawing connectors.
fn tree<C, L>(roots: &[NodeId], children: C, label: L) -> String
where
    C: Fn(NodeId) -> Vec<NodeId>,
    L: Fn(NodeId) -> String,
{
    let mut out = String::new();
    let mut seen = HashSet::new();
    // (node, prefix, is_last, depth)
    let mut stack: Vec<(NodeId, String, bool, usize)> = roots
        .iter()
        .rev()
        .map(|r| (*r, String::new(), true, 0))
        .collect();

    while let Some((node, prefix, last, depth)) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        let connector = match (depth, last) {
            (0, _) => "",
            (_, true) => "└── ",
            (_, false) => "├── ",
        };
        let _ = writeln!(out, "{prefix}{connector}{}", label(node));

        let child_prefix = match depth {
            0 => String::new(),
            _ if last => format!("{prefix}    "),
            _ => format!("{prefix}│   "),
        };
        let kids = children(node);
        for (i, child) in kids.iter().enumerate().rev() {
            stack.push((*child, child_prefix.clone(), i + 1 == kids.len(), depth + 1));
        }
    }
    out
}

pub fn node_tree(workbench: &NodeWorkbench) -> String {
    let topology = workbench.topology();
    let label = |node: NodeId| {
        let server = topology
            .get(node)
            .map(|r| r.server.to_string())
            .or_else(|| workbench.staged().addition(node).map(|a| a.server.to_string()))
            .unwrap_or_default();
        let status = match workbench.status(node) {
            Some(NodeStatus::Live(state)) => state.to_string(),
            Some(NodeStatus::Hypothetical) => "[new]".to_string(),
            Some(NodeStatus::PendingRemoval) => "[delete]".to_string(),
            None => "?".to_string(),
        };
        format!("{node} {server} {status}")
    };
    tree(&topology.roots(), |n| workbench.children(n), label)
}

pub fn installation_tree(workbench: &ApplicationWorkbench) -> String {
    let topology = workbench.topology();
    let label = |node: NodeId| {
        let status = match workbench.status(node) {
            Some(InstallStatus::Live(state)) => state.to_string(),
            Some(InstallStatus::StagedInstall) => "[install]".to_string(),
            Some(InstallStatus::PendingRemoval) => "[uninstall]".to_string(),
            Some(InstallStatus::NotInstalled) | None => "-".to_string(),
        };
        format!("{node} {status}")
    };
    tree(&topology.roots(), |n| topology.children(n).to_vec(), label)
}

pub fn topology_diff(diff: &TopologyDiff) -> String {
    let mut out = String::new();
    for d in &diff.deletions {
        let _ = writeln!(out, "- node {} (waits for {:?})", d.node_id, d.wait_for);
    }
    for a in &diff.additions {
        let _ = writeln!(out, "+ node {} under {} on {}", a.node_id, a.parent_id, a.server);
    }
    out
}

pub fn installation_diff(diff: &InstallationDiff) -> String {
    let mut out = String::new();
    for r in &diff.removals {
        let _ = writeln!(
            out,
            "- {} from node {} (waits for {:?})",
            r.application_name, r.node_id, r.wait_for
        );
    }
    for i in &diff.installs {
        let _ = writeln!(
            out,
            "+ {} on node {} (waits for {:?})",
            i.application_name, i.node_id, i.wait_for
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachenet_topology::{DeploymentRecord, DeploymentState, NO_PARENT, Topology};

    #[test]
    fn node_tree_marks_staged_nodes() {
        let topology = Topology::from_records([
            DeploymentRecord::new(1, NO_PARENT, "srv-1", DeploymentState::Deployed),
            DeploymentRecord::new(2, 1, "srv-2", DeploymentState::Deployed),
            DeploymentRecord::new(3, 2, "srv-3", DeploymentState::Deployed),
        ]);
        let mut wb = NodeWorkbench::new(topology);
        wb.delete_subtree(3).unwrap();
        wb.add_node(1, 4, "srv-4").unwrap();

        assert_eq!(
            node_tree(&wb),
            "1 srv-1 DEPLOYED\n\
             ├── 2 srv-2 DEPLOYED\n\
             │   └── 3 srv-3 [delete]\n\
             └── 4 srv-4 [new]\n"
        );
        assert_eq!(
            topology_diff(&wb.diff()),
            "- node 3 (waits for [-1])\n+ node 4 under 1 on srv-4\n"
        );
    }
}
