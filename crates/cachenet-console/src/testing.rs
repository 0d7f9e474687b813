//! In-memory `ConsoleApi` for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use cachenet_client::{
    ApiError, ApiResult, ApplicationForm, ConsoleApi, LogQuery, NodeLogDates, ServerForm,
};
use cachenet_topology::{
    ApplicationRecord, ApplicationStatusRecord, DeploymentRecord, ServerRecord, ServerRef,
    StagedAddition, StagedAppChange, StagedDeletion,
};

/// Serves canned collections, records every call by name, and fails the
/// calls listed in `failures`.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub deployments: Mutex<Vec<DeploymentRecord>>,
    pub servers: Mutex<Vec<ServerRecord>>,
    pub applications: Mutex<Vec<ApplicationRecord>>,
    pub statuses: Mutex<Vec<ApplicationStatusRecord>>,
    pub calls: Mutex<Vec<String>>,
    pub bodies: Mutex<Vec<serde_json::Value>>,
    failures: Mutex<HashMap<&'static str, Vec<String>>>,
    hold_deployments: AtomicBool,
    release: Notify,
}

impl FakeApi {
    pub fn with_deployments(records: Vec<DeploymentRecord>) -> Self {
        let api = Self::default();
        *api.deployments.lock().unwrap() = records;
        api
    }

    pub fn fail(&self, call: &'static str, reason: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(call, vec![reason.to_string()]);
    }

    /// Make `list_deployments` block until `release_deployments`.
    pub fn hold_deployments(&self) {
        self.hold_deployments.store(true, Ordering::SeqCst);
    }

    pub fn release_deployments(&self) {
        self.hold_deployments.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: &'static str) -> ApiResult<()> {
        self.calls.lock().unwrap().push(call.to_string());
        match self.failures.lock().unwrap().get(call) {
            Some(reasons) => Err(ApiError::Server {
                status: 409,
                reasons: reasons.clone(),
            }),
            None => Ok(()),
        }
    }

    fn record_body<T: serde::Serialize>(&self, call: &'static str, body: &T) -> ApiResult<()> {
        self.bodies
            .lock()
            .unwrap()
            .push(serde_json::json!({ call: body }));
        self.record(call)
    }
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn list_deployments(&self) -> ApiResult<Vec<DeploymentRecord>> {
        self.record("list_deployments")?;
        if self.hold_deployments.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        Ok(self.deployments.lock().unwrap().clone())
    }

    async fn add_nodes(&self, records: &[StagedAddition]) -> ApiResult<()> {
        self.record_body("add_nodes", &records)
    }

    async fn remove_nodes(&self, records: &[StagedDeletion]) -> ApiResult<()> {
        self.record_body("remove_nodes", &records)
    }

    async fn retry_node(&self, record: &DeploymentRecord) -> ApiResult<()> {
        self.record_body("retry_node", record)
    }

    async fn list_servers(&self) -> ApiResult<Vec<ServerRecord>> {
        self.record("list_servers")?;
        Ok(self.servers.lock().unwrap().clone())
    }

    async fn create_server(&self, _form: &ServerForm) -> ApiResult<()> {
        self.record("create_server")
    }

    async fn update_server(&self, _server: &ServerRef, _form: &ServerForm) -> ApiResult<()> {
        self.record("update_server")
    }

    async fn delete_server(&self, server: &ServerRef) -> ApiResult<()> {
        self.record_body("delete_server", server)
    }

    async fn list_applications(&self) -> ApiResult<Vec<ApplicationRecord>> {
        self.record("list_applications")?;
        Ok(self.applications.lock().unwrap().clone())
    }

    async fn create_application(&self, _form: &ApplicationForm) -> ApiResult<()> {
        self.record("create_application")
    }

    async fn remove_application(&self, name: &str) -> ApiResult<()> {
        self.record_body("remove_application", &name)
    }

    async fn list_application_statuses(&self) -> ApiResult<Vec<ApplicationStatusRecord>> {
        self.record("list_application_statuses")?;
        Ok(self.statuses.lock().unwrap().clone())
    }

    async fn install_application(&self, records: &[StagedAppChange]) -> ApiResult<()> {
        self.record_body("install_application", &records)
    }

    async fn uninstall_application(&self, records: &[StagedAppChange]) -> ApiResult<()> {
        self.record_body("uninstall_application", &records)
    }

    async fn available_log_dates(&self) -> ApiResult<Vec<NodeLogDates>> {
        self.record("available_log_dates")?;
        Ok(vec![])
    }

    async fn fetch_logs(&self, query: &LogQuery) -> ApiResult<serde_json::Value> {
        self.record("fetch_logs")?;
        Ok(serde_json::json!([{ "node_id": query.node_id, "level": query.log_level.as_str() }]))
    }
}
