//! Node workbench rules: staging node additions and subtree deletions.
//!
//! Both operations take the deployed snapshot and the current staged
//! state and return a new staged state. The combined tree is the deployed
//! snapshot plus staged additions hanging off it.

use tracing::{debug, warn};

use crate::error::{TopologyError, TopologyResult};
use crate::staged::{StagedAddition, StagedDeletion, StagedTopology};
use crate::topology::{Topology, post_order};
use crate::types::*;

/// How a node appears in the combined (deployed ∪ staged) tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Deployed record, not touched by the workbench.
    Live(DeploymentState),
    /// Staged addition, not yet submitted.
    Hypothetical,
    /// Deployed record staged for deletion.
    PendingRemoval,
}

/// Status of `node` in the combined tree, or `None` if it does not exist.
pub fn node_status(topology: &Topology, staged: &StagedTopology, node: NodeId) -> Option<NodeStatus> {
    if staged.is_hypothetical(node) {
        return Some(NodeStatus::Hypothetical);
    }
    if staged.is_pending_removal(node) {
        return Some(NodeStatus::PendingRemoval);
    }
    topology.state(node).map(NodeStatus::Live)
}

/// Children of `node` in the combined tree: deployed children first, then
/// staged additions in staging order.
pub fn combined_children(topology: &Topology, staged: &StagedTopology, node: NodeId) -> Vec<NodeId> {
    let mut children = topology.children(node).to_vec();
    children.extend(staged.added_children(node));
    children
}

/// Whether `server` hosts a deployed node or a staged addition.
pub fn server_in_use(topology: &Topology, staged: &StagedTopology, server: &ServerRef) -> bool {
    topology.server_in_use(server) || staged.additions().any(|a| &a.server == server)
}

/// Stage a new node under an existing attach point.
///
/// The parent must be a deployed node not staged for deletion, or a staged
/// addition. The node id must be unused in the combined tree, and the
/// server must not host any deployed or staged node.
pub fn stage_node_addition(
    topology: &Topology,
    staged: &StagedTopology,
    addition: StagedAddition,
) -> TopologyResult<StagedTopology> {
    let parent = addition.parent_id;
    if !staged.is_hypothetical(parent) {
        match topology.state(parent) {
            None => return Err(TopologyError::UnknownParent(parent)),
            Some(DeploymentState::Deployed) if staged.is_pending_removal(parent) => {
                return Err(TopologyError::ParentPendingRemoval(parent));
            }
            Some(DeploymentState::Deployed) => {}
            Some(_) => return Err(TopologyError::NodeNotDeployed(parent)),
        }
    }

    if addition.node_id == NO_PARENT
        || topology.contains(addition.node_id)
        || staged.is_hypothetical(addition.node_id)
    {
        return Err(TopologyError::DuplicateNode(addition.node_id));
    }

    if server_in_use(topology, staged, &addition.server) {
        return Err(TopologyError::ServerInUse(addition.server));
    }

    debug!(
        node = addition.node_id,
        parent,
        server = %addition.server,
        "staged node addition"
    );

    let mut next = staged.clone();
    next.additions.insert(addition.node_id, addition);
    Ok(next)
}

/// Stage removal of `node` and everything below it.
///
/// Descendants are visited before their parent. Staged additions are
/// withdrawn; deployed nodes get a deletion entry waiting on their
/// children; any node mid-transition rejects the whole operation.
pub fn stage_subtree_deletion(
    topology: &Topology,
    staged: &StagedTopology,
    node: NodeId,
) -> TopologyResult<StagedTopology> {
    if !topology.contains(node) && !staged.is_hypothetical(node) {
        return Err(TopologyError::UnknownNode(node));
    }

    let order = post_order(node, |n| combined_children(topology, staged, n))?;
    let mut next = staged.clone();

    for id in order {
        if next.additions.shift_remove(&id).is_some() {
            debug!(node = id, "withdrew staged addition");
            continue;
        }

        let Some(record) = topology.get(id) else {
            return Err(TopologyError::UnknownNode(id));
        };

        match record.state {
            DeploymentState::Deployed => {
                let wait_for = wait_for_children(topology.children(id));
                debug!(node = id, ?wait_for, "staged node deletion");
                next.deletions.insert(id, StagedDeletion { node_id: id, wait_for });
            }
            DeploymentState::Failed => return Err(TopologyError::NodeFailed(id)),
            state @ (DeploymentState::WaitingDeployment
            | DeploymentState::Deploying
            | DeploymentState::ProcessingDeploying
            | DeploymentState::WaitingRemoval
            | DeploymentState::Removing
            | DeploymentState::ProcessingRemoving) => {
                return Err(TopologyError::NodeNotSettled { node: id, state });
            }
        }
    }

    Ok(next)
}

/// `children`, or the sentinel marker when there are none.
pub(crate) fn wait_for_children(children: &[NodeId]) -> Vec<NodeId> {
    if children.is_empty() {
        vec![NO_PARENT]
    } else {
        children.to_vec()
    }
}

/// Re-stage `staged` against a newer `topology`.
///
/// Deletions are replayed from the top of each staged subtree, then
/// additions in staging order. Entries that no longer pass are dropped
/// and their errors returned, so the result obeys the same rules as a
/// freshly built staged state.
pub fn restage_topology(
    topology: &Topology,
    staged: &StagedTopology,
) -> (StagedTopology, Vec<TopologyError>) {
    let mut next = StagedTopology::new();
    let mut dropped = Vec::new();

    let subtree_roots = staged.deletions().map(|d| d.node_id).filter(|id| {
        topology
            .parent(*id)
            .is_none_or(|parent| !staged.is_pending_removal(parent))
    });
    for id in subtree_roots.collect::<Vec<_>>() {
        match stage_subtree_deletion(topology, &next, id) {
            Ok(restaged) => next = restaged,
            Err(e) => {
                warn!(node = id, error = %e, "dropped staged deletion");
                dropped.push(e);
            }
        }
    }

    for addition in staged.additions() {
        match stage_node_addition(topology, &next, addition.clone()) {
            Ok(restaged) => next = restaged,
            Err(e) => {
                warn!(node = addition.node_id, error = %e, "dropped staged addition");
                dropped.push(e);
            }
        }
    }

    (next, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: NodeId, parent: NodeId, state: DeploymentState) -> DeploymentRecord {
        DeploymentRecord::new(id, parent, format!("srv-{id}"), state)
    }

    /// root(1) → A(2) → B(3), all deployed.
    fn chain() -> Topology {
        Topology::from_records([
            record(1, NO_PARENT, DeploymentState::Deployed),
            record(2, 1, DeploymentState::Deployed),
            record(3, 2, DeploymentState::Deployed),
        ])
    }

    // ── Additions ──────────────────────────────────────────────────

    #[test]
    fn addition_under_deployed_parent() {
        let staged = stage_node_addition(&chain(), &StagedTopology::new(), StagedAddition::new(2, 10, "srv-new"))
            .unwrap();
        assert_eq!(staged.addition(10), Some(&StagedAddition::new(2, 10, "srv-new")));
        assert_eq!(staged.deletions().count(), 0);
    }

    #[test]
    fn addition_under_hypothetical_parent() {
        let topology = chain();
        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(3, 10, "x")).unwrap();
        let staged = stage_node_addition(&topology, &staged, StagedAddition::new(10, 11, "y")).unwrap();
        assert_eq!(combined_children(&topology, &staged, 10), vec![11]);
    }

    #[test]
    fn addition_with_duplicate_id_is_rejected() {
        let topology = chain();
        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(1, 10, "x")).unwrap();

        let deployed_dup = stage_node_addition(&topology, &staged, StagedAddition::new(1, 3, "y"));
        assert_eq!(deployed_dup, Err(TopologyError::DuplicateNode(3)));

        let staged_dup = stage_node_addition(&topology, &staged, StagedAddition::new(1, 10, "z"));
        assert_eq!(staged_dup, Err(TopologyError::DuplicateNode(10)));

        // Nothing was touched by the failed calls.
        assert_eq!(staged.additions().count(), 1);
        assert_eq!(staged.deletions().count(), 0);
    }

    #[test]
    fn addition_with_unknown_parent_is_rejected() {
        let result = stage_node_addition(&chain(), &StagedTopology::new(), StagedAddition::new(42, 10, "x"));
        assert_eq!(result, Err(TopologyError::UnknownParent(42)));
    }

    #[test]
    fn addition_under_transitional_parent_is_rejected() {
        let topology = Topology::from_records([
            record(1, NO_PARENT, DeploymentState::Deployed),
            record(2, 1, DeploymentState::Deploying),
        ]);
        let result = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(2, 10, "x"));
        assert_eq!(result, Err(TopologyError::NodeNotDeployed(2)));
    }

    #[test]
    fn addition_under_parent_pending_removal_is_rejected() {
        let topology = chain();
        let staged = stage_subtree_deletion(&topology, &StagedTopology::new(), 3).unwrap();
        let result = stage_node_addition(&topology, &staged, StagedAddition::new(3, 10, "x"));
        assert_eq!(result, Err(TopologyError::ParentPendingRemoval(3)));
    }

    #[test]
    fn addition_on_used_server_is_rejected() {
        let topology = chain();
        let deployed = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(1, 10, "srv-2"));
        assert_eq!(deployed, Err(TopologyError::ServerInUse(ServerRef::new("srv-2"))));

        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(1, 10, "fresh")).unwrap();
        let again = stage_node_addition(&topology, &staged, StagedAddition::new(1, 11, "fresh"));
        assert_eq!(again, Err(TopologyError::ServerInUse(ServerRef::new("fresh"))));
    }

    // ── Deletions ──────────────────────────────────────────────────

    #[test]
    fn deletion_is_bottom_up_with_children_wait_for() {
        let staged = stage_subtree_deletion(&chain(), &StagedTopology::new(), 1).unwrap();
        let deletions: Vec<_> = staged.deletions().cloned().collect();
        assert_eq!(
            deletions,
            vec![
                StagedDeletion { node_id: 3, wait_for: vec![NO_PARENT] },
                StagedDeletion { node_id: 2, wait_for: vec![3] },
                StagedDeletion { node_id: 1, wait_for: vec![2] },
            ]
        );
    }

    #[test]
    fn deletion_over_transitional_node_is_atomic() {
        let topology = Topology::from_records([
            record(1, NO_PARENT, DeploymentState::Deployed),
            record(2, 1, DeploymentState::Deployed),
            record(3, 2, DeploymentState::Deploying),
            record(4, 2, DeploymentState::Deployed),
        ]);
        let before = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(4, 10, "x")).unwrap();

        let result = stage_subtree_deletion(&topology, &before, 2);
        assert_eq!(
            result,
            Err(TopologyError::NodeNotSettled {
                node: 3,
                state: DeploymentState::Deploying
            })
        );
        // The caller's staged state is untouched.
        assert!(before.is_hypothetical(10));
        assert_eq!(before.deletions().count(), 0);
    }

    #[test]
    fn deletion_failure_after_processed_siblings_commits_nothing() {
        // 4 is visited and staged before 5 fails.
        let topology = Topology::from_records([
            record(1, NO_PARENT, DeploymentState::Deployed),
            record(4, 1, DeploymentState::Deployed),
            record(5, 1, DeploymentState::Removing),
        ]);
        let staged = StagedTopology::new();
        let result = stage_subtree_deletion(&topology, &staged, 1);
        assert!(matches!(result, Err(TopologyError::NodeNotSettled { node: 5, .. })));
        assert!(staged.is_empty());
    }

    #[test]
    fn deleting_a_staged_addition_withdraws_it() {
        let topology = chain();
        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(3, 10, "x")).unwrap();
        let staged = stage_subtree_deletion(&topology, &staged, 10).unwrap();
        assert!(staged.is_empty());
    }

    #[test]
    fn deleting_deployed_parent_withdraws_hypothetical_children() {
        let topology = chain();
        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(3, 10, "x")).unwrap();
        let staged = stage_node_addition(&topology, &staged, StagedAddition::new(10, 11, "y")).unwrap();
        let staged = stage_subtree_deletion(&topology, &staged, 3).unwrap();

        assert_eq!(staged.additions().count(), 0);
        assert_eq!(
            staged.deletion(3),
            Some(&StagedDeletion { node_id: 3, wait_for: vec![NO_PARENT] })
        );
    }

    #[test]
    fn deleting_failed_node_is_rejected() {
        let topology = Topology::from_records([
            record(1, NO_PARENT, DeploymentState::Deployed),
            record(2, 1, DeploymentState::Failed),
        ]);
        let result = stage_subtree_deletion(&topology, &StagedTopology::new(), 1);
        assert_eq!(result, Err(TopologyError::NodeFailed(2)));
    }

    #[test]
    fn deleting_unknown_node_is_rejected() {
        let result = stage_subtree_deletion(&chain(), &StagedTopology::new(), 77);
        assert_eq!(result, Err(TopologyError::UnknownNode(77)));
    }

    #[test]
    fn repeated_deletion_is_idempotent() {
        let topology = chain();
        let once = stage_subtree_deletion(&topology, &StagedTopology::new(), 2).unwrap();
        let twice = stage_subtree_deletion(&topology, &once, 2).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn node_status_reflects_staging() {
        let topology = chain();
        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(1, 10, "x")).unwrap();
        let staged = stage_subtree_deletion(&topology, &staged, 3).unwrap();

        assert_eq!(node_status(&topology, &staged, 10), Some(NodeStatus::Hypothetical));
        assert_eq!(node_status(&topology, &staged, 3), Some(NodeStatus::PendingRemoval));
        assert_eq!(
            node_status(&topology, &staged, 2),
            Some(NodeStatus::Live(DeploymentState::Deployed))
        );
        assert_eq!(node_status(&topology, &staged, 99), None);
    }

    // ── Re-staging ─────────────────────────────────────────────────

    #[test]
    fn restage_against_same_snapshot_keeps_everything() {
        let topology = chain();
        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(1, 10, "x")).unwrap();
        let staged = stage_subtree_deletion(&topology, &staged, 2).unwrap();

        let (restaged, dropped) = restage_topology(&topology, &staged);
        assert_eq!(restaged, staged);
        assert!(dropped.is_empty());
    }

    #[test]
    fn restage_drops_addition_whose_id_is_now_deployed() {
        let staged = stage_node_addition(&chain(), &StagedTopology::new(), StagedAddition::new(1, 10, "srv-x")).unwrap();
        let staged = stage_node_addition(&chain(), &staged, StagedAddition::new(10, 11, "srv-y")).unwrap();

        let mut records: Vec<_> = chain().records().cloned().collect();
        records.push(DeploymentRecord::new(10, 2, "srv-other", DeploymentState::Deploying));
        let newer = Topology::from_records(records);

        let (restaged, dropped) = restage_topology(&newer, &staged);
        // Node 11 hung off the dropped node 10, which is now a deploying record.
        assert_eq!(
            dropped,
            vec![TopologyError::DuplicateNode(10), TopologyError::NodeNotDeployed(10)]
        );
        assert!(restaged.is_empty());
        assert_eq!(node_status(&newer, &restaged, 10), Some(NodeStatus::Live(DeploymentState::Deploying)));
    }

    #[test]
    fn restage_recomputes_deletions_over_new_children() {
        let staged = stage_subtree_deletion(&chain(), &StagedTopology::new(), 2).unwrap();

        let mut records: Vec<_> = chain().records().cloned().collect();
        records.push(record(4, 3, DeploymentState::Deployed));
        let newer = Topology::from_records(records);

        let (restaged, dropped) = restage_topology(&newer, &staged);
        assert!(dropped.is_empty());
        let entries: Vec<_> = restaged.deletions().map(|d| (d.node_id, d.wait_for.clone())).collect();
        assert_eq!(entries, vec![(4, vec![NO_PARENT]), (3, vec![4]), (2, vec![3])]);
    }

    #[test]
    fn restage_drops_whole_subtree_when_a_node_is_busy() {
        let staged = stage_subtree_deletion(&chain(), &StagedTopology::new(), 2).unwrap();
        let newer = Topology::from_records([
            record(1, NO_PARENT, DeploymentState::Deployed),
            record(2, 1, DeploymentState::Deployed),
            record(3, 2, DeploymentState::Removing),
        ]);

        let (restaged, dropped) = restage_topology(&newer, &staged);
        assert_eq!(
            dropped,
            vec![TopologyError::NodeNotSettled {
                node: 3,
                state: DeploymentState::Removing
            }]
        );
        assert_eq!(restaged.deletions().count(), 0);
    }
}
