//! `HttpConsoleApi`, the REST client over reqwest.
//!
//! Status ≥ 400 is an error whose body is a list of `{"error": ...}`
//! objects (or a single one); anything below is success with a JSON body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use cachenet_topology::{
    ApplicationRecord, ApplicationStatusRecord, DeploymentRecord, RecordBatch, ServerRecord,
    ServerRef, StagedAddition, StagedAppChange, StagedDeletion,
};

use crate::api::{ConsoleApi, LogQuery, NodeLogDates};
use crate::endpoint::{Endpoint, LOGS_PATH};
use crate::error::{ApiError, ApiResult};
use crate::forms::{ApplicationForm, ServerForm};

/// REST client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct HttpConsoleApi {
    client: Client,
    base_url: Url,
}

impl HttpConsoleApi {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        // Endpoint paths are joined relative to the base, so it must end in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("cachenet-console/0.1")
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `path` under the base URL, keeping any prefix the base carries.
    pub fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.url(path)?;
        debug!(%method, %url, "api request");
        Ok(self.client.request(method, url))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let resp = self.request(Method::GET, path)?.send().await?;
        read_json(resp).await
    }

    async fn send_unit(&self, builder: RequestBuilder) -> ApiResult<()> {
        let resp = builder.send().await?;
        read_json::<serde_json::Value>(resp).await.map(|_| ())
    }
}

/// Decode a response following the API's status convention.
async fn read_json<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let status = resp.status();
    let url = resp.url().clone();
    let body = resp.bytes().await?;

    if status.as_u16() >= 400 {
        let reasons = error_reasons(status.as_u16(), &body);
        warn!(status = status.as_u16(), %url, ?reasons, "api request failed");
        return Err(ApiError::Server {
            status: status.as_u16(),
            reasons,
        });
    }

    let payload: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null".as_slice()
    } else {
        &body[..]
    };
    serde_json::from_slice(payload).map_err(|e| ApiError::Decode(format!("{url}: {e}")))
}

#[derive(Deserialize)]
struct ErrorReason {
    error: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Many(Vec<ErrorReason>),
    One(ErrorReason),
}

/// Reasons from an error body: a list of `{error}`, a single `{error}`,
/// or the raw text.
pub fn error_reasons(status: u16, body: &[u8]) -> Vec<String> {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody::Many(list)) if !list.is_empty() => list.into_iter().map(|r| r.error).collect(),
        Ok(ErrorBody::One(reason)) => vec![reason.error],
        _ => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                vec![format!("request failed with status {status}")]
            } else {
                vec![text]
            }
        }
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn list_deployments(&self) -> ApiResult<Vec<DeploymentRecord>> {
        self.get_json(Endpoint::Deployment.path()).await
    }

    async fn add_nodes(&self, records: &[StagedAddition]) -> ApiResult<()> {
        let body = RecordBatch::new(records.to_vec());
        self.send_unit(self.request(Method::POST, Endpoint::Deployment.path())?.json(&body))
            .await
    }

    async fn remove_nodes(&self, records: &[StagedDeletion]) -> ApiResult<()> {
        let body = RecordBatch::new(records.to_vec());
        self.send_unit(self.request(Method::DELETE, Endpoint::Deployment.path())?.json(&body))
            .await
    }

    async fn retry_node(&self, record: &DeploymentRecord) -> ApiResult<()> {
        let body = json!({ "record": record });
        self.send_unit(self.request(Method::PUT, Endpoint::Deployment.path())?.json(&body))
            .await
    }

    async fn list_servers(&self) -> ApiResult<Vec<ServerRecord>> {
        self.get_json(Endpoint::Servers.path()).await
    }

    async fn create_server(&self, form: &ServerForm) -> ApiResult<()> {
        let builder = self.request(Method::POST, Endpoint::Servers.path())?;
        self.send_unit(builder.multipart(form.to_multipart(None))).await
    }

    async fn update_server(&self, server: &ServerRef, form: &ServerForm) -> ApiResult<()> {
        let builder = self.request(Method::PUT, Endpoint::Servers.path())?;
        self.send_unit(builder.multipart(form.to_multipart(Some(server)))).await
    }

    async fn delete_server(&self, server: &ServerRef) -> ApiResult<()> {
        let builder = self
            .request(Method::DELETE, Endpoint::Servers.path())?
            .query(&[("server_uuid", server.as_str())]);
        self.send_unit(builder).await
    }

    async fn list_applications(&self) -> ApiResult<Vec<ApplicationRecord>> {
        self.get_json(Endpoint::Applications.path()).await
    }

    async fn create_application(&self, form: &ApplicationForm) -> ApiResult<()> {
        let builder = self.request(Method::POST, Endpoint::Applications.path())?;
        self.send_unit(builder.multipart(form.to_multipart())).await
    }

    async fn remove_application(&self, name: &str) -> ApiResult<()> {
        let body = json!({ "applicationName": name });
        self.send_unit(self.request(Method::DELETE, Endpoint::Applications.path())?.json(&body))
            .await
    }

    async fn list_application_statuses(&self) -> ApiResult<Vec<ApplicationStatusRecord>> {
        self.get_json(Endpoint::ApplicationManagement.path()).await
    }

    async fn install_application(&self, records: &[StagedAppChange]) -> ApiResult<()> {
        let body = RecordBatch::new(records.to_vec());
        let builder = self.request(Method::POST, Endpoint::ApplicationManagement.path())?;
        self.send_unit(builder.json(&body)).await
    }

    async fn uninstall_application(&self, records: &[StagedAppChange]) -> ApiResult<()> {
        let body = RecordBatch::new(records.to_vec());
        let builder = self.request(Method::DELETE, Endpoint::ApplicationManagement.path())?;
        self.send_unit(builder.json(&body)).await
    }

    async fn available_log_dates(&self) -> ApiResult<Vec<NodeLogDates>> {
        self.get_json(Endpoint::AvailableLogDates.path()).await
    }

    async fn fetch_logs(&self, query: &LogQuery) -> ApiResult<serde_json::Value> {
        let builder = self.request(Method::GET, LOGS_PATH)?.query(&[
            ("node_id", query.node_id.to_string()),
            ("date", query.date.clone()),
            ("log_level", query.log_level.as_str().to_string()),
        ]);
        read_json(builder.send().await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_reasons_from_list() {
        let body = br#"[{"error": "node 3 busy"}, {"error": "server offline"}]"#;
        assert_eq!(error_reasons(400, body), vec!["node 3 busy", "server offline"]);
    }

    #[test]
    fn error_reasons_from_single_object() {
        let body = br#"{"error": "unknown application"}"#;
        assert_eq!(error_reasons(404, body), vec!["unknown application"]);
    }

    #[test]
    fn error_reasons_fall_back_to_text() {
        assert_eq!(error_reasons(502, b"Bad Gateway\n"), vec!["Bad Gateway"]);
        assert_eq!(error_reasons(500, b""), vec!["request failed with status 500"]);
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        let result = HttpConsoleApi::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    }

    #[test]
    fn paths_join_onto_base() {
        let api = HttpConsoleApi::new("http://127.0.0.1:8080", Duration::from_secs(1)).unwrap();
        let url = api.url(Endpoint::Deployment.path()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/api/v1/deployment");
    }

    #[test]
    fn base_path_prefix_is_kept() {
        for base in ["http://h:8080/console", "http://h:8080/console/"] {
            let api = HttpConsoleApi::new(base, Duration::from_secs(1)).unwrap();
            assert_eq!(api.base_url().as_str(), "http://h:8080/console/");
            assert_eq!(
                api.url(Endpoint::Deployment.path()).unwrap().as_str(),
                "http://h:8080/console/api/v1/deployment"
            );
            assert_eq!(
                api.url(LOGS_PATH).unwrap().as_str(),
                "http://h:8080/console/api/v1/logs"
            );
        }
    }
}
