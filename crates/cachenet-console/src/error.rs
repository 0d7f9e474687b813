//! Error types for console sessions and workbenches.

use thiserror::Error;

use cachenet_client::{ApiError, FormError};
use cachenet_topology::{DeploymentState, NodeId, ServerRef, SubmitBatch, TopologyError};

/// Result type alias for console operations.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// One rejected half of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch: SubmitBatch,
    pub reasons: Vec<String>,
}

/// Errors from submitting a workbench.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("no changes to submit")]
    NoChanges,

    #[error("workbench is closed")]
    Closed,

    /// Staged state of every failed half is preserved.
    #[error("submission rejected: {}", describe(.0))]
    Rejected(Vec<BatchFailure>),
}

fn describe(failures: &[BatchFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.batch, f.reasons.join("; ")))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Errors surfaced to the operator by a console session.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("no application selected")]
    NoApplicationSelected,

    #[error("unknown application: {0}")]
    UnknownApplication(String),

    #[error("server {0} hosts a node and cannot be deleted")]
    ServerInUse(ServerRef),

    #[error("node {node} is {state}; only FAILED nodes can be retried")]
    NotRetryable { node: NodeId, state: DeploymentState },
}

impl ConsoleError {
    /// Lines for an error notice.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Api(e) => e.reasons(),
            Self::Submit(SubmitError::Rejected(failures)) => failures
                .iter()
                .flat_map(|f| f.reasons.iter().map(move |r| format!("{}: {r}", f.batch)))
                .collect(),
            other => vec![other.to_string()],
        }
    }
}
