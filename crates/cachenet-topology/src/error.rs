//! Validation errors raised while staging hypothetical changes.

use thiserror::Error;

use crate::types::{ApplicationState, DeploymentState, NodeId, ServerRef};

/// Result type alias for staging operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// A staged change that would violate a topology or installation rule.
///
/// Every variant is raised before the staged state is replaced, so the
/// caller's previous staged state is always still valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("invalid parent: node {0} is neither deployed nor staged")]
    UnknownParent(NodeId),

    #[error("invalid parent: node {0} is staged for removal")]
    ParentPendingRemoval(NodeId),

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("server already in use: {0}")]
    ServerInUse(ServerRef),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error(
        "cannot delete a subtree containing node {node} in state {state}: \
         nodes must be fully deployed or hypothetical"
    )]
    NodeNotSettled { node: NodeId, state: DeploymentState },

    #[error("node {0} failed deployment; retry it before removing its subtree")]
    NodeFailed(NodeId),

    #[error("node {0} is not deployed")]
    NodeNotDeployed(NodeId),

    #[error("topology contains a cycle through node {0}")]
    Cycle(NodeId),

    #[error("cannot install on node {node}: node {ancestor} is queued for deletion")]
    AncestorPendingRemoval { node: NodeId, ancestor: NodeId },

    #[error("cannot install on node {node}: node {ancestor} is in state {state}")]
    AncestorRemoving {
        node: NodeId,
        ancestor: NodeId,
        state: ApplicationState,
    },

    #[error("application {application} is not installed on node {node}")]
    NotInstalled { node: NodeId, application: String },

    #[error(
        "cannot remove application from a subtree containing node {node} in state {state}: \
         nodes must be installed or hypothetical"
    )]
    AppNodeBusy { node: NodeId, state: ApplicationState },
}
