//! Staged (hypothetical) changes awaiting submission.
//!
//! Staged maps preserve insertion order, which is the order the
//! validators visited nodes in. Validators never mutate a staged value in
//! place: they clone it, apply the whole operation to the clone, and
//! return the clone only on success.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, ServerRef};

// ── Topology ──────────────────────────────────────────────────────

/// A node the operator wants to add under `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedAddition {
    pub parent_id: NodeId,
    pub node_id: NodeId,
    #[serde(rename = "server_uuid")]
    pub server: ServerRef,
}

impl StagedAddition {
    pub fn new(parent_id: NodeId, node_id: NodeId, server: impl Into<String>) -> Self {
        Self {
            parent_id,
            node_id,
            server: ServerRef::new(server),
        }
    }
}

/// A deployed node the operator wants removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedDeletion {
    pub node_id: NodeId,
    /// Immediate children at staging time, or `[NO_PARENT]` for a leaf.
    pub wait_for: Vec<NodeId>,
}

/// Staged node additions and deletions for one workbench.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedTopology {
    pub(crate) additions: IndexMap<NodeId, StagedAddition>,
    pub(crate) deletions: IndexMap<NodeId, StagedDeletion>,
}

impl StagedTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn additions(&self) -> impl Iterator<Item = &StagedAddition> {
        self.additions.values()
    }

    pub fn deletions(&self) -> impl Iterator<Item = &StagedDeletion> {
        self.deletions.values()
    }

    pub fn addition(&self, node: NodeId) -> Option<&StagedAddition> {
        self.additions.get(&node)
    }

    pub fn deletion(&self, node: NodeId) -> Option<&StagedDeletion> {
        self.deletions.get(&node)
    }

    /// The node exists only as a staged addition.
    pub fn is_hypothetical(&self, node: NodeId) -> bool {
        self.additions.contains_key(&node)
    }

    pub fn is_pending_removal(&self, node: NodeId) -> bool {
        self.deletions.contains_key(&node)
    }

    /// Staged additions whose parent is `node`, in staging order.
    pub fn added_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.additions
            .values()
            .filter(move |a| a.parent_id == node)
            .map(|a| a.node_id)
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    pub fn clear_additions(&mut self) {
        self.additions.clear();
    }

    pub fn clear_deletions(&mut self) {
        self.deletions.clear();
    }
}

// ── Applications ──────────────────────────────────────────────────

/// A staged install or uninstall of an application on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedAppChange {
    pub node_id: NodeId,
    pub application_name: String,
    /// Installs wait for the parent; removals wait for the children.
    pub wait_for: Vec<NodeId>,
}

/// Staged installs and removals of a single application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedInstallation {
    pub(crate) installs: IndexMap<NodeId, StagedAppChange>,
    pub(crate) removals: IndexMap<NodeId, StagedAppChange>,
}

impl StagedInstallation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installs(&self) -> impl Iterator<Item = &StagedAppChange> {
        self.installs.values()
    }

    pub fn removals(&self) -> impl Iterator<Item = &StagedAppChange> {
        self.removals.values()
    }

    pub fn install(&self, node: NodeId) -> Option<&StagedAppChange> {
        self.installs.get(&node)
    }

    pub fn removal(&self, node: NodeId) -> Option<&StagedAppChange> {
        self.removals.get(&node)
    }

    pub fn is_staged_install(&self, node: NodeId) -> bool {
        self.installs.contains_key(&node)
    }

    pub fn is_pending_removal(&self, node: NodeId) -> bool {
        self.removals.contains_key(&node)
    }

    pub fn is_empty(&self) -> bool {
        self.installs.is_empty() && self.removals.is_empty()
    }

    pub fn clear_installs(&mut self) {
        self.installs.clear();
    }

    pub fn clear_removals(&mut self) {
        self.removals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_serializes_server_uuid() {
        let addition = StagedAddition::new(1, 7, "srv-7");
        let value = serde_json::to_value(&addition).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"parent_id": 1, "node_id": 7, "server_uuid": "srv-7"})
        );
    }

    #[test]
    fn added_children_follow_staging_order() {
        let mut staged = StagedTopology::new();
        staged.additions.insert(9, StagedAddition::new(1, 9, "a"));
        staged.additions.insert(5, StagedAddition::new(2, 5, "b"));
        staged.additions.insert(6, StagedAddition::new(1, 6, "c"));

        let children: Vec<_> = staged.added_children(1).collect();
        assert_eq!(children, vec![9, 6]);
        assert!(staged.is_hypothetical(5));
        assert!(!staged.is_pending_removal(5));
    }

    #[test]
    fn clearing_one_half_keeps_the_other() {
        let mut staged = StagedTopology::new();
        staged.additions.insert(9, StagedAddition::new(1, 9, "a"));
        staged.deletions.insert(
            3,
            StagedDeletion {
                node_id: 3,
                wait_for: vec![-1],
            },
        );

        staged.clear_additions();
        assert!(!staged.is_empty());
        assert!(staged.is_pending_removal(3));

        staged.clear_deletions();
        assert!(staged.is_empty());
    }
}
