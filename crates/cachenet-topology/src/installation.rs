//! Application workbench rules: staging installs and subtree removals.
//!
//! The installation tree of an application is the deployed topology
//! annotated with that application's status records. Installs cascade
//! top-down (each node waits on its parent); removals cascade bottom-up
//! (each node waits on its children).

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::error::{TopologyError, TopologyResult};
use crate::nodes::wait_for_children;
use crate::staged::{StagedAppChange, StagedInstallation};
use crate::topology::{Topology, post_order};
use crate::types::*;

/// Status records of one application, indexed by node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallationView {
    application: String,
    statuses: BTreeMap<NodeId, ApplicationStatusRecord>,
}

impl InstallationView {
    /// Keep only the records belonging to `application`.
    pub fn from_records<'a>(
        application: &str,
        records: impl IntoIterator<Item = &'a ApplicationStatusRecord>,
    ) -> Self {
        let statuses = records
            .into_iter()
            .filter(|r| r.application_name == application)
            .map(|r| (r.node_id, r.clone()))
            .collect();
        Self {
            application: application.to_string(),
            statuses,
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn state(&self, node: NodeId) -> Option<ApplicationState> {
        self.statuses.get(&node).map(|r| r.state)
    }

    pub fn status(&self, node: NodeId) -> Option<&ApplicationStatusRecord> {
        self.statuses.get(&node)
    }

    pub fn statuses(&self) -> impl Iterator<Item = &ApplicationStatusRecord> {
        self.statuses.values()
    }
}

/// How a node appears in an application's installation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    NotInstalled,
    Live(ApplicationState),
    StagedInstall,
    PendingRemoval,
}

pub fn install_status(view: &InstallationView, staged: &StagedInstallation, node: NodeId) -> InstallStatus {
    if staged.is_staged_install(node) {
        InstallStatus::StagedInstall
    } else if staged.is_pending_removal(node) {
        InstallStatus::PendingRemoval
    } else {
        view.state(node).map_or(InstallStatus::NotInstalled, InstallStatus::Live)
    }
}

/// Stage an install of the view's application on `node`.
///
/// `topology` must be the deployed subset. Ancestors without a status
/// record are staged first, root-most first, each waiting on its own
/// parent. Nodes already installed or staged are left alone.
pub fn stage_install(
    topology: &Topology,
    view: &InstallationView,
    staged: &StagedInstallation,
    node: NodeId,
) -> TopologyResult<StagedInstallation> {
    // Walk up from the target, collecting nodes that still need an install.
    let mut pending: Vec<(NodeId, NodeId)> = Vec::new();
    let mut seen = HashSet::new();
    let mut current = node;

    while current != NO_PARENT {
        if !seen.insert(current) {
            return Err(TopologyError::Cycle(current));
        }
        let record = match topology.get(current) {
            Some(r) if r.state == DeploymentState::Deployed => r,
            _ => return Err(TopologyError::NodeNotDeployed(current)),
        };
        if staged.is_pending_removal(current) {
            return Err(TopologyError::AncestorPendingRemoval {
                node,
                ancestor: current,
            });
        }
        if staged.is_staged_install(current) {
            break;
        }
        match view.state(current) {
            None => {
                pending.push((current, record.parent_id));
                current = record.parent_id;
            }
            Some(
                ApplicationState::WaitingInstall
                | ApplicationState::Installing
                | ApplicationState::ProcessingInstalling
                | ApplicationState::Installed,
            ) => break,
            Some(
                state @ (ApplicationState::WaitingRemove
                | ApplicationState::Removing
                | ApplicationState::ProcessingRemoving),
            ) => {
                return Err(TopologyError::AncestorRemoving {
                    node,
                    ancestor: current,
                    state,
                });
            }
        }
    }

    let mut next = staged.clone();
    for (id, parent) in pending.into_iter().rev() {
        debug!(
            application = view.application(),
            node = id,
            wait_for = parent,
            "staged application install"
        );
        next.installs.insert(
            id,
            StagedAppChange {
                node_id: id,
                application_name: view.application().to_string(),
                wait_for: vec![parent],
            },
        );
    }
    Ok(next)
}

/// Stage removal of the view's application from `node` and its subtree.
///
/// Nodes are visited after their descendants. Staged installs are
/// withdrawn; installed nodes get a removal entry waiting on their
/// installed children; nodes in any other live state reject the whole
/// operation. Subtree nodes without the application are skipped.
pub fn stage_uninstall(
    topology: &Topology,
    view: &InstallationView,
    staged: &StagedInstallation,
    node: NodeId,
) -> TopologyResult<StagedInstallation> {
    match topology.state(node) {
        Some(DeploymentState::Deployed) => {}
        _ => return Err(TopologyError::NodeNotDeployed(node)),
    }
    if view.state(node).is_none() && !staged.is_staged_install(node) {
        return Err(TopologyError::NotInstalled {
            node,
            application: view.application().to_string(),
        });
    }

    let order = post_order(node, |n| topology.children(n).to_vec())?;
    let mut next = staged.clone();

    for id in order {
        if next.installs.shift_remove(&id).is_some() {
            debug!(application = view.application(), node = id, "withdrew staged install");
            continue;
        }

        match view.state(id) {
            None => {}
            Some(ApplicationState::Installed) => {
                let installed_children: Vec<NodeId> = topology
                    .children(id)
                    .iter()
                    .copied()
                    .filter(|c| view.state(*c).is_some())
                    .collect();
                let wait_for = wait_for_children(&installed_children);
                debug!(
                    application = view.application(),
                    node = id,
                    ?wait_for,
                    "staged application removal"
                );
                next.removals.insert(
                    id,
                    StagedAppChange {
                        node_id: id,
                        application_name: view.application().to_string(),
                        wait_for,
                    },
                );
            }
            Some(
                state @ (ApplicationState::WaitingInstall
                | ApplicationState::Installing
                | ApplicationState::ProcessingInstalling
                | ApplicationState::WaitingRemove
                | ApplicationState::Removing
                | ApplicationState::ProcessingRemoving),
            ) => {
                return Err(TopologyError::AppNodeBusy { node: id, state });
            }
        }
    }

    Ok(next)
}

/// Re-stage `staged` against newer status records and topology.
///
/// Removals are replayed from the top of each staged subtree, then
/// installs in staging order. Entries that no longer pass are dropped and
/// their errors returned.
pub fn restage_installation(
    topology: &Topology,
    view: &InstallationView,
    staged: &StagedInstallation,
) -> (StagedInstallation, Vec<TopologyError>) {
    let mut next = StagedInstallation::new();
    let mut dropped = Vec::new();

    let subtree_roots: Vec<NodeId> = staged
        .removals()
        .map(|r| r.node_id)
        .filter(|id| {
            topology
                .parent(*id)
                .is_none_or(|parent| !staged.is_pending_removal(parent))
        })
        .collect();
    for id in subtree_roots {
        match stage_uninstall(topology, view, &next, id) {
            Ok(restaged) => next = restaged,
            Err(e) => {
                warn!(application = view.application(), node = id, error = %e, "dropped staged removal");
                dropped.push(e);
            }
        }
    }

    for install in staged.installs() {
        match stage_install(topology, view, &next, install.node_id) {
            Ok(restaged) => next = restaged,
            Err(e) => {
                warn!(application = view.application(), node = install.node_id, error = %e, "dropped staged install");
                dropped.push(e);
            }
        }
    }

    (next, dropped)
}
