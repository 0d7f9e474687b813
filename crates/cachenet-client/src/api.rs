//! The `ConsoleApi` seam: every REST call the console makes.
//!
//! Sessions hold an `Arc<dyn ConsoleApi>` so tests can swap in an
//! in-memory implementation.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cachenet_topology::{
    ApplicationRecord, ApplicationStatusRecord, DeploymentRecord, NodeId, ServerRecord, ServerRef,
    StagedAddition, StagedAppChange, StagedDeletion,
};

use crate::error::ApiResult;
use crate::forms::{ApplicationForm, ServerForm};

/// Log severity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of `GET /api/v1/logs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub node_id: NodeId,
    /// Date as listed by `available_log_dates`.
    pub date: String,
    pub log_level: LogLevel,
}

/// Dates for which a node has logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLogDates {
    pub node_id: NodeId,
    #[serde(default)]
    pub dates: Vec<String>,
}

/// Client for the cachenet REST API.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    // ── Deployment ─────────────────────────────────────────────────

    async fn list_deployments(&self) -> ApiResult<Vec<DeploymentRecord>>;

    async fn add_nodes(&self, records: &[StagedAddition]) -> ApiResult<()>;

    async fn remove_nodes(&self, records: &[StagedDeletion]) -> ApiResult<()>;

    /// Reset a failed node to `WAITING_DEPLOYMENT`.
    async fn retry_node(&self, record: &DeploymentRecord) -> ApiResult<()>;

    // ── Servers ────────────────────────────────────────────────────

    async fn list_servers(&self) -> ApiResult<Vec<ServerRecord>>;

    async fn create_server(&self, form: &ServerForm) -> ApiResult<()>;

    async fn update_server(&self, server: &ServerRef, form: &ServerForm) -> ApiResult<()>;

    async fn delete_server(&self, server: &ServerRef) -> ApiResult<()>;

    // ── Applications ───────────────────────────────────────────────

    async fn list_applications(&self) -> ApiResult<Vec<ApplicationRecord>>;

    async fn create_application(&self, form: &ApplicationForm) -> ApiResult<()>;

    async fn remove_application(&self, name: &str) -> ApiResult<()>;

    async fn list_application_statuses(&self) -> ApiResult<Vec<ApplicationStatusRecord>>;

    async fn install_application(&self, records: &[StagedAppChange]) -> ApiResult<()>;

    async fn uninstall_application(&self, records: &[StagedAppChange]) -> ApiResult<()>;

    // ── Logs ───────────────────────────────────────────────────────

    async fn available_log_dates(&self) -> ApiResult<Vec<NodeLogDates>>;

    /// Log entries are passed through as returned by the server.
    async fn fetch_logs(&self, query: &LogQuery) -> ApiResult<serde_json::Value>;
}
