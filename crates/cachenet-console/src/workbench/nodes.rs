use tracing::debug;

use cachenet_client::ConsoleApi;
use cachenet_topology::{
    NodeId, NodeStatus, StagedAddition, StagedTopology, Topology, TopologyDiff, TopologyError,
    TopologyResult, combined_children, node_status, restage_topology, stage_node_addition,
    stage_subtree_deletion,
};

use super::submit::{SubmitOutcome, send_batches};
use crate::error::SubmitError;

/// Staged node additions and subtree deletions over one topology snapshot.
#[derive(Debug, Clone)]
pub struct NodeWorkbench {
    topology: Topology,
    staged: StagedTopology,
    open: bool,
}

impl NodeWorkbench {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            staged: StagedTopology::new(),
            open: true,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn staged(&self) -> &StagedTopology {
        &self.staged
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Move to a newer snapshot. Staged edits are replayed against it;
    /// the ones that no longer pass are dropped and returned.
    pub fn refresh(&mut self, topology: Topology) -> Vec<TopologyError> {
        let (staged, dropped) = restage_topology(&topology, &self.staged);
        self.topology = topology;
        self.staged = staged;
        dropped
    }

    pub fn status(&self, node: NodeId) -> Option<NodeStatus> {
        node_status(&self.topology, &self.staged, node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        combined_children(&self.topology, &self.staged, node)
    }

    pub fn add_node(
        &mut self,
        parent_id: NodeId,
        node_id: NodeId,
        server: impl Into<String>,
    ) -> TopologyResult<()> {
        let addition = StagedAddition::new(parent_id, node_id, server);
        self.staged = stage_node_addition(&self.topology, &self.staged, addition)?;
        debug!(parent_id, node_id, "staged node addition");
        Ok(())
    }

    pub fn delete_subtree(&mut self, node: NodeId) -> TopologyResult<()> {
        self.staged = stage_subtree_deletion(&self.topology, &self.staged, node)?;
        debug!(node, "staged subtree deletion");
        Ok(())
    }

    pub fn reset(&mut self) {
        self.staged = StagedTopology::new();
    }

    pub fn diff(&self) -> TopologyDiff {
        TopologyDiff::from(&self.staged)
    }

    /// Send deletions and additions concurrently. Each accepted half is
    /// cleared; a rejected half stays staged. The workbench closes once
    /// both halves are accepted.
    pub async fn submit(&mut self, api: &dyn ConsoleApi) -> Result<SubmitOutcome, SubmitError> {
        if !self.open {
            return Err(SubmitError::Closed);
        }
        let diff = self.diff();
        if diff.is_empty() {
            return Err(SubmitError::NoChanges);
        }

        let removals = (!diff.deletions.is_empty()).then(|| api.remove_nodes(&diff.deletions));
        let additions = (!diff.additions.is_empty()).then(|| api.add_nodes(&diff.additions));
        let results = send_batches(removals, additions).await;

        if matches!(results.removals, Some(Ok(()))) {
            self.staged.clear_deletions();
        }
        if matches!(results.additions, Some(Ok(()))) {
            self.staged.clear_additions();
        }
        let outcome = results.finish(diff.deletions.len(), diff.additions.len())?;
        self.open = false;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use cachenet_topology::{DeploymentRecord, DeploymentState, NO_PARENT, ServerRef, SubmitBatch};

    fn topology() -> Topology {
        Topology::from_records([
            DeploymentRecord::new(1, NO_PARENT, "srv-1", DeploymentState::Deployed),
            DeploymentRecord::new(2, 1, "srv-2", DeploymentState::Deployed),
            DeploymentRecord::new(3, 2, "srv-3", DeploymentState::Deployed),
        ])
    }

    #[tokio::test]
    async fn empty_diff_makes_no_request() {
        let api = FakeApi::default();
        let mut wb = NodeWorkbench::new(topology());

        assert_eq!(wb.submit(&api).await, Err(SubmitError::NoChanges));
        assert!(api.calls().is_empty());
        assert!(wb.is_open());
    }

    #[tokio::test]
    async fn accepted_submission_closes_workbench() {
        let api = FakeApi::default();
        let mut wb = NodeWorkbench::new(topology());
        wb.add_node(1, 10, "srv-10").unwrap();
        wb.add_node(10, 11, "srv-11").unwrap();
        wb.delete_subtree(2).unwrap();

        let outcome = wb.submit(&api).await.unwrap();
        assert_eq!(outcome, SubmitOutcome { removed: 2, added: 2 });
        assert!(!wb.is_open());
        assert!(wb.staged().is_empty());

        let mut calls = api.calls();
        calls.sort();
        assert_eq!(calls, vec!["add_nodes", "remove_nodes"]);
        assert_eq!(wb.submit(&api).await, Err(SubmitError::Closed));
    }

    #[tokio::test]
    async fn only_nonempty_half_is_sent() {
        let api = FakeApi::default();
        let mut wb = NodeWorkbench::new(topology());
        wb.add_node(3, 4, "srv-4").unwrap();

        wb.submit(&api).await.unwrap();
        assert_eq!(api.calls(), vec!["add_nodes"]);
    }

    #[tokio::test]
    async fn rejected_half_stays_staged() {
        let api = FakeApi::default();
        api.fail("add_nodes", "server srv-10 unreachable");
        let mut wb = NodeWorkbench::new(topology());
        wb.add_node(1, 10, "srv-10").unwrap();
        wb.delete_subtree(3).unwrap();

        let err = wb.submit(&api).await.unwrap_err();
        let SubmitError::Rejected(failures) = err else {
            panic!("expected rejection");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].batch, SubmitBatch::Additions);
        assert_eq!(failures[0].reasons, vec!["server srv-10 unreachable".to_string()]);

        assert!(wb.is_open());
        assert!(wb.staged().is_hypothetical(10));
        assert!(!wb.staged().is_pending_removal(3));
    }

    #[test]
    fn failed_edit_leaves_staged_state_alone() {
        let mut wb = NodeWorkbench::new(topology());
        wb.add_node(1, 10, "srv-10").unwrap();
        let before = wb.staged().clone();

        assert_eq!(
            wb.add_node(1, 11, "srv-10"),
            Err(TopologyError::ServerInUse(ServerRef::from("srv-10")))
        );
        assert_eq!(wb.staged(), &before);
    }

    #[test]
    fn reset_discards_edits_and_children_reflect_staging() {
        let mut wb = NodeWorkbench::new(topology());
        wb.add_node(1, 10, "srv-10").unwrap();
        assert_eq!(wb.children(1), vec![2, 10]);
        assert_eq!(wb.status(10), Some(NodeStatus::Hypothetical));

        wb.reset();
        assert!(wb.diff().is_empty());
        assert_eq!(wb.children(1), vec![2]);
    }

    #[test]
    fn refresh_drops_additions_that_collide_with_new_nodes() {
        let mut wb = NodeWorkbench::new(topology());
        wb.add_node(1, 10, "srv-x").unwrap();
        wb.delete_subtree(3).unwrap();

        let mut records: Vec<_> = topology().records().cloned().collect();
        records.push(DeploymentRecord::new(10, 1, "srv-other", DeploymentState::Deploying));
        let dropped = wb.refresh(Topology::from_records(records));

        assert_eq!(dropped, vec![TopologyError::DuplicateNode(10)]);
        assert_eq!(wb.status(10), Some(NodeStatus::Live(DeploymentState::Deploying)));
        assert!(wb.diff().additions().is_empty());
        // The unrelated deletion survives.
        assert_eq!(wb.status(3), Some(NodeStatus::PendingRemoval));
    }
}
