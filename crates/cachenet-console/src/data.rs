//! Latest polled API state, shared between the poller and sessions.

use std::sync::Arc;

use tokio::sync::RwLock;

use cachenet_client::NodeLogDates;
use cachenet_topology::{
    ApplicationRecord, ApplicationStatusRecord, DeploymentRecord, InstallationView, ServerRecord,
    Topology,
};

/// One copy of everything the console has fetched.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub deployments: Vec<DeploymentRecord>,
    pub servers: Vec<ServerRecord>,
    pub applications: Vec<ApplicationRecord>,
    pub statuses: Vec<ApplicationStatusRecord>,
    pub log_dates: Vec<NodeLogDates>,
}

impl Snapshot {
    pub fn topology(&self) -> Topology {
        Topology::from_records(self.deployments.iter().cloned())
    }

    pub fn has_application(&self, name: &str) -> bool {
        self.applications.iter().any(|a| a.name == name)
    }

    pub fn installation(&self, application: &str) -> InstallationView {
        InstallationView::from_records(application, self.statuses.iter())
    }
}

/// Shared handle to the latest snapshot. Each setter replaces one
/// collection wholesale, so the last response to arrive wins.
#[derive(Debug, Clone, Default)]
pub struct ConsoleData {
    inner: Arc<RwLock<Snapshot>>,
}

impl ConsoleData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub async fn topology(&self) -> Topology {
        self.inner.read().await.topology()
    }

    pub async fn set_deployments(&self, records: Vec<DeploymentRecord>) {
        self.inner.write().await.deployments = records;
    }

    pub async fn set_servers(&self, records: Vec<ServerRecord>) {
        self.inner.write().await.servers = records;
    }

    pub async fn set_applications(&self, records: Vec<ApplicationRecord>) {
        self.inner.write().await.applications = records;
    }

    pub async fn set_statuses(&self, records: Vec<ApplicationStatusRecord>) {
        self.inner.write().await.statuses = records;
    }

    pub async fn set_log_dates(&self, records: Vec<NodeLogDates>) {
        self.inner.write().await.log_dates = records;
    }
}
