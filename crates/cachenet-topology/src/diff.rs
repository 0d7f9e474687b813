//! Diff assembly: the staged state flattened into submission batches.
//!
//! A submission is split into a removal batch and an addition batch. Each
//! batch is sent as `{"records": [...]}`; records keep staging order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::staged::*;

/// Request body for batched submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBatch<T> {
    pub records: Vec<T>,
}

impl<T> RecordBatch<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Which half of a submission a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitBatch {
    Removals,
    Additions,
}

impl fmt::Display for SubmitBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removals => f.write_str("removals"),
            Self::Additions => f.write_str("additions"),
        }
    }
}

/// Node changes ready to submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyDiff {
    pub additions: Vec<StagedAddition>,
    pub deletions: Vec<StagedDeletion>,
}

impl TopologyDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Additions in staging order, parents before children.
    pub fn additions(&self) -> &[StagedAddition] {
        &self.additions
    }

    /// Deletions in staging order, children before parents.
    pub fn deletions(&self) -> &[StagedDeletion] {
        &self.deletions
    }
}

impl From<&StagedTopology> for TopologyDiff {
    fn from(staged: &StagedTopology) -> Self {
        Self {
            additions: staged.additions().cloned().collect(),
            deletions: staged.deletions().cloned().collect(),
        }
    }
}

/// Application changes ready to submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallationDiff {
    pub installs: Vec<StagedAppChange>,
    pub removals: Vec<StagedAppChange>,
}

impl InstallationDiff {
    pub fn is_empty(&self) -> bool {
        self.installs.is_empty() && self.removals.is_empty()
    }

    pub fn installs(&self) -> &[StagedAppChange] {
        &self.installs
    }

    pub fn removals(&self) -> &[StagedAppChange] {
        &self.removals
    }
}

impl From<&StagedInstallation> for InstallationDiff {
    fn from(staged: &StagedInstallation) -> Self {
        Self {
            installs: staged.installs().cloned().collect(),
            removals: staged.removals().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{stage_node_addition, stage_subtree_deletion};
    use crate::topology::Topology;
    use crate::types::*;

    #[test]
    fn diff_keeps_staging_order() {
        let topology = Topology::from_records([
            DeploymentRecord::new(1, NO_PARENT, "srv-1", DeploymentState::Deployed),
            DeploymentRecord::new(2, 1, "srv-2", DeploymentState::Deployed),
        ]);
        let staged = stage_node_addition(&topology, &StagedTopology::new(), StagedAddition::new(1, 8, "a")).unwrap();
        let staged = stage_node_addition(&topology, &staged, StagedAddition::new(1, 5, "b")).unwrap();
        let staged = stage_subtree_deletion(&topology, &staged, 2).unwrap();

        let diff = TopologyDiff::from(&staged);
        let added: Vec<_> = diff.additions.iter().map(|a| a.node_id).collect();
        assert_eq!(added, vec![8, 5]);
        assert_eq!(diff.deletions.len(), 1);
        assert!(!diff.is_empty());
    }

    #[test]
    fn empty_staging_gives_empty_diff() {
        assert!(TopologyDiff::from(&StagedTopology::new()).is_empty());
        assert!(InstallationDiff::from(&StagedInstallation::new()).is_empty());
    }

    #[test]
    fn record_batch_wire_shape() {
        let batch = RecordBatch::new(vec![StagedDeletion {
            node_id: 4,
            wait_for: vec![NO_PARENT],
        }]);
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value, serde_json::json!({"records": [{"node_id": 4, "wait_for": [-1]}]}));
    }
}
