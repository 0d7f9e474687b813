//! cachenet-topology: hypothetical change engine for the cachenet console.
//!
//! Models the deployed node tree and per-application installation state,
//! and validates operator edits staged against them before submission.
//!
//! # Components
//!
//! - **`topology`**: immutable snapshot of the deployed node tree
//! - **`staged`**: staged additions/deletions and installs/removals
//! - **`nodes`**: node addition and subtree deletion rules
//! - **`installation`**: application install and subtree removal rules
//! - **`diff`**: staged state flattened into submission batches
//! - **`selector`**: per-selector (per-application) staged state
//!
//! Every staging function is pure: it takes the current snapshot and
//! staged state by reference and returns a new staged state, or an error
//! that leaves the caller's state as it was.

pub mod diff;
pub mod error;
pub mod installation;
pub mod nodes;
pub mod selector;
pub mod staged;
pub mod topology;
pub mod types;

pub use diff::{InstallationDiff, RecordBatch, SubmitBatch, TopologyDiff};
pub use error::{TopologyError, TopologyResult};
pub use installation::{
    InstallStatus, InstallationView, install_status, restage_installation, stage_install,
    stage_uninstall,
};
pub use nodes::{
    NodeStatus, combined_children, node_status, restage_topology, server_in_use,
    stage_node_addition, stage_subtree_deletion,
};
pub use selector::SelectorCache;
pub use staged::*;
pub use topology::Topology;
pub use types::*;
