//! An operator session against one API.

use std::sync::Arc;

use tracing::{info, warn};

use cachenet_client::{
    ApplicationForm, ConsoleApi, Endpoint, HttpConsoleApi, LogQuery, NodeLogDates, ServerForm,
};
use cachenet_topology::{NodeId, ServerRef, TopologyError};

use crate::config::ConsoleConfig;
use crate::data::ConsoleData;
use crate::error::{ConsoleError, ConsoleResult};
use crate::poll::{PollOutcome, Poller};
use crate::workbench::{ApplicationWorkbench, NodeWorkbench, SubmitOutcome};

/// API client, polled data and settings for one console.
#[derive(Clone)]
pub struct ConsoleSession {
    api: Arc<dyn ConsoleApi>,
    poller: Poller,
    config: ConsoleConfig,
}

impl ConsoleSession {
    pub fn new(api: Arc<dyn ConsoleApi>, config: ConsoleConfig) -> Self {
        let poller = Poller::new(api.clone(), ConsoleData::new());
        Self {
            api,
            poller,
            config,
        }
    }

    /// Session over HTTP using the configured base URL and timeout.
    pub fn connect(config: ConsoleConfig) -> ConsoleResult<Self> {
        let api = HttpConsoleApi::new(&config.api.base_url, config.timeout())?;
        info!(base_url = %api.base_url(), "console session");
        Ok(Self::new(Arc::new(api), config))
    }

    pub fn api(&self) -> &dyn ConsoleApi {
        self.api.as_ref()
    }

    pub fn data(&self) -> &ConsoleData {
        self.poller.data()
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Poll every endpoint once.
    pub async fn refresh(&self) -> Vec<(Endpoint, PollOutcome)> {
        self.poller.poll_once().await
    }

    pub async fn node_workbench(&self) -> NodeWorkbench {
        NodeWorkbench::new(self.data().topology().await)
    }

    pub async fn application_workbench(&self) -> ApplicationWorkbench {
        let snapshot = self.data().snapshot().await;
        ApplicationWorkbench::new(
            &snapshot.topology(),
            snapshot.applications.iter().map(|a| a.name.clone()),
            snapshot.statuses,
        )
    }

    /// Carry an open node workbench over to the latest polled topology.
    /// Returns the staged edits that no longer apply.
    pub async fn resync_nodes(&self, workbench: &mut NodeWorkbench) -> Vec<TopologyError> {
        let dropped = workbench.refresh(self.data().topology().await);
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), "staged node edits no longer apply");
        }
        dropped
    }

    /// Carry an open application workbench over to the latest polled state.
    pub async fn resync_applications(
        &self,
        workbench: &mut ApplicationWorkbench,
    ) -> Vec<(String, TopologyError)> {
        let snapshot = self.data().snapshot().await;
        let dropped = workbench.refresh(&snapshot.topology(), snapshot.statuses);
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), "staged application edits no longer apply");
        }
        dropped
    }

    /// Submit a node workbench; re-polls after a fully accepted submission.
    pub async fn submit_nodes(&self, workbench: &mut NodeWorkbench) -> ConsoleResult<SubmitOutcome> {
        let outcome = workbench.submit(self.api()).await?;
        self.refresh().await;
        Ok(outcome)
    }

    /// Submit an application workbench; re-polls after a fully accepted
    /// submission.
    pub async fn submit_applications(
        &self,
        workbench: &mut ApplicationWorkbench,
    ) -> ConsoleResult<SubmitOutcome> {
        let outcome = workbench.submit(self.api()).await?;
        self.refresh().await;
        Ok(outcome)
    }

    /// Put a failed node back to waiting for deployment.
    pub async fn retry_node(&self, node: NodeId) -> ConsoleResult<()> {
        let topology = self.data().topology().await;
        let record = topology.get(node).ok_or(TopologyError::UnknownNode(node))?;
        if !record.state.can_retry() {
            return Err(ConsoleError::NotRetryable {
                node,
                state: record.state,
            });
        }
        self.api.retry_node(record).await?;
        info!(node, "retry requested");
        self.poller.poll_endpoint(Endpoint::Deployment).await;
        Ok(())
    }

    pub async fn create_server(&self, form: &ServerForm) -> ConsoleResult<()> {
        form.validate()?;
        self.api.create_server(form).await?;
        info!(name = %form.name, "server created");
        self.poller.poll_endpoint(Endpoint::Servers).await;
        Ok(())
    }

    pub async fn update_server(&self, server: &ServerRef, form: &ServerForm) -> ConsoleResult<()> {
        form.validate()?;
        self.api.update_server(server, form).await?;
        info!(%server, "server updated");
        self.poller.poll_endpoint(Endpoint::Servers).await;
        Ok(())
    }

    /// Delete a server that hosts no node.
    pub async fn delete_server(&self, server: &ServerRef) -> ConsoleResult<()> {
        if self.data().topology().await.server_in_use(server) {
            warn!(%server, "refusing to delete server in use");
            return Err(ConsoleError::ServerInUse(server.clone()));
        }
        self.api.delete_server(server).await?;
        info!(%server, "server deleted");
        self.poller.poll_endpoint(Endpoint::Servers).await;
        Ok(())
    }

    pub async fn create_application(&self, form: &ApplicationForm) -> ConsoleResult<()> {
        form.validate(&self.config.applications.name_prefix)?;
        self.api.create_application(form).await?;
        info!(application = %form.application_name, "application created");
        self.poller.poll_endpoint(Endpoint::Applications).await;
        Ok(())
    }

    pub async fn remove_application(&self, name: &str) -> ConsoleResult<()> {
        self.api.remove_application(name).await?;
        info!(application = name, "application removed");
        self.poller.poll_endpoint(Endpoint::Applications).await;
        Ok(())
    }

    pub async fn log_dates(&self) -> ConsoleResult<Vec<NodeLogDates>> {
        Ok(self.api.available_log_dates().await?)
    }

    pub async fn fetch_logs(&self, query: &LogQuery) -> ConsoleResult<serde_json::Value> {
        Ok(self.api.fetch_logs(query).await?)
    }
}
