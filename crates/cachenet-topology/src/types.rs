//! Domain types for the cachenet topology model.
//!
//! These mirror the records served by the cachenet REST API. All types
//! serialize to/from JSON with snake_case fields; life-cycle states use
//! the SCREAMING_SNAKE_CASE names the API reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node in the topology tree.
pub type NodeId = i64;

/// Id of the distinguished root node.
pub const ROOT_NODE_ID: NodeId = 1;

/// Parent id of the root, also used as the "no children" marker in
/// `wait_for` lists.
pub const NO_PARENT: NodeId = -1;

/// Opaque reference to the server hosting a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerRef(pub String);

impl ServerRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServerRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Deployment ─────────────────────────────────────────────────────

/// Life-cycle state of a node, driven by the distributed system.
///
/// `WaitingDeployment → Deploying → ProcessingDeploying → Deployed`, then
/// `Deployed → WaitingRemoval → Removing → ProcessingRemoving → (gone)`.
/// `Failed` is reachable from the deploying branch and only leaves via
/// an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    WaitingDeployment,
    Deploying,
    ProcessingDeploying,
    Deployed,
    WaitingRemoval,
    Removing,
    ProcessingRemoving,
    Failed,
}

impl DeploymentState {
    pub fn is_deploying(self) -> bool {
        matches!(
            self,
            Self::WaitingDeployment | Self::Deploying | Self::ProcessingDeploying
        )
    }

    pub fn is_removing(self) -> bool {
        matches!(
            self,
            Self::WaitingRemoval | Self::Removing | Self::ProcessingRemoving
        )
    }

    /// Only failed deployments can be reset to `WaitingDeployment`.
    pub fn can_retry(self) -> bool {
        self == Self::Failed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaitingDeployment => "WAITING_DEPLOYMENT",
            Self::Deploying => "DEPLOYING",
            Self::ProcessingDeploying => "PROCESSING_DEPLOYING",
            Self::Deployed => "DEPLOYED",
            Self::WaitingRemoval => "WAITING_REMOVAL",
            Self::Removing => "REMOVING",
            Self::ProcessingRemoving => "PROCESSING_REMOVING",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the deployed topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub node_id: NodeId,
    pub parent_id: NodeId,
    #[serde(rename = "server_uuid")]
    pub server: ServerRef,
    pub state: DeploymentState,
}

impl DeploymentRecord {
    pub fn new(node_id: NodeId, parent_id: NodeId, server: impl Into<String>, state: DeploymentState) -> Self {
        Self {
            node_id,
            parent_id,
            server: ServerRef::new(server),
            state,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == NO_PARENT
    }
}

// ── Servers ────────────────────────────────────────────────────────

/// Authentication type used to reach a server over SSH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Password,
    Key,
}

/// A provisioned machine that can host nodes.
///
/// Connection attributes are opaque to the validators; only `server_uuid`
/// participates in topology rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    #[serde(rename = "server_uuid")]
    pub id: ServerRef,
    pub name: String,
    pub ip: String,
    pub username: String,
    pub ssh_port: u16,
    pub grpc_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthType>,
}

// ── Applications ───────────────────────────────────────────────────

/// An installable application (keyspace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    #[serde(alias = "application_name")]
    pub name: String,
}

/// Installation life cycle of an application on one node.
///
/// `WaitingInstall → Installing → ProcessingInstalling → Installed`, then
/// `Installed → WaitingRemove → Removing → ProcessingRemoving → (gone)`.
/// A node with no status record is not installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationState {
    WaitingInstall,
    Installing,
    ProcessingInstalling,
    Installed,
    WaitingRemove,
    Removing,
    ProcessingRemoving,
}

impl ApplicationState {
    pub fn is_installing_or_installed(self) -> bool {
        matches!(
            self,
            Self::WaitingInstall | Self::Installing | Self::ProcessingInstalling | Self::Installed
        )
    }

    pub fn is_removing(self) -> bool {
        matches!(
            self,
            Self::WaitingRemove | Self::Removing | Self::ProcessingRemoving
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::WaitingInstall => "WAITING_INSTALL",
            Self::Installing => "INSTALLING",
            Self::ProcessingInstalling => "PROCESSING_INSTALLING",
            Self::Installed => "INSTALLED",
            Self::WaitingRemove => "WAITING_REMOVE",
            Self::Removing => "REMOVING",
            Self::ProcessingRemoving => "PROCESSING_REMOVING",
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install/uninstall status of one application on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatusRecord {
    pub node_id: NodeId,
    pub application_name: String,
    pub state: ApplicationState,
    /// Node ids this transition is blocked on.
    #[serde(default)]
    pub wait_for: Vec<NodeId>,
}
