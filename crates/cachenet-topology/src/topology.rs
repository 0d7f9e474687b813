//! Topology snapshot: the deployed node tree as last reported by the API.
//!
//! Records are indexed by node id with a parent → children index so the
//! validators can walk the tree in either direction. The snapshot is
//! immutable once built; a refresh builds a new one.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::{TopologyError, TopologyResult};
use crate::types::*;

/// Immutable view of the deployed topology.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    records: BTreeMap<NodeId, DeploymentRecord>,
    /// parent id → child ids, sorted ascending.
    children: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Topology {
    /// Build a snapshot from API records. A repeated node id keeps the
    /// last record seen.
    pub fn from_records(records: impl IntoIterator<Item = DeploymentRecord>) -> Self {
        let mut by_id = BTreeMap::new();
        for record in records {
            if let Some(old) = by_id.insert(record.node_id, record) {
                debug!(node = old.node_id, "duplicate deployment record replaced");
            }
        }

        let mut children: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for record in by_id.values() {
            children
                .entry(record.parent_id)
                .or_default()
                .push(record.node_id);
        }

        Self {
            records: by_id,
            children,
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&DeploymentRecord> {
        self.records.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.records.contains_key(&node)
    }

    pub fn state(&self, node: NodeId) -> Option<DeploymentState> {
        self.records.get(&node).map(|r| r.state)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.records.get(&node).map(|r| r.parent_id)
    }

    /// Immediate children of `node` among the snapshot's records.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn records(&self) -> impl Iterator<Item = &DeploymentRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Nodes whose parent is the sentinel or is missing from the snapshot.
    pub fn roots(&self) -> Vec<NodeId> {
        self.records
            .values()
            .filter(|r| r.is_root() || !self.records.contains_key(&r.parent_id))
            .map(|r| r.node_id)
            .collect()
    }

    /// Whether any record is hosted on `server`.
    pub fn server_in_use(&self, server: &ServerRef) -> bool {
        self.records.values().any(|r| &r.server == server)
    }

    /// The `Deployed` records only; this is the tree the installation
    /// workbench operates on.
    pub fn deployed_subset(&self) -> Topology {
        Self::from_records(
            self.records
                .values()
                .filter(|r| r.state == DeploymentState::Deployed)
                .cloned(),
        )
    }

    /// Ancestor chain of `node`, nearest first, ending at the root.
    pub fn ancestors(&self, node: NodeId) -> TopologyResult<Vec<NodeId>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([node]);
        let mut current = self.parent(node).ok_or(TopologyError::UnknownNode(node))?;
        while current != NO_PARENT {
            if !seen.insert(current) {
                return Err(TopologyError::Cycle(current));
            }
            chain.push(current);
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(chain)
    }
}

/// Depth-first post-order walk from `root`: every node appears after all
/// of its descendants. Children are visited in the order `children`
/// returns them.
pub(crate) fn post_order<F>(root: NodeId, children: F) -> TopologyResult<Vec<NodeId>>
where
    F: Fn(NodeId) -> Vec<NodeId>,
{
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![(root, false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !seen.insert(node) {
            return Err(TopologyError::Cycle(node));
        }
        stack.push((node, true));
        for child in children(node).into_iter().rev() {
            stack.push((child, false));
        }
    }

    Ok(order)
}
