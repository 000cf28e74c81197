//! Generic JSON-over-HTTP monitor backend
//!
//! The built-in `"http"` backend type. It polls `GET {url}/status` for a
//! JSON status document and issues commands as JSON `POST`s. Useful for
//! self-written agents and as the reference implementation for vendor
//! backends, which live outside this crate and register their own type
//! tags.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::ServerConfig;
use crate::status::{FetchedStatus, HostStatus, ServiceState, ServiceStatus};

use super::error::{BackendError, BackendResult};
use super::{AcknowledgeParams, DowntimeParams, MonitorBackend, SubmitResultParams};

/// Wire format of the status document. Owned by this backend, not by the
/// engine.
#[derive(Debug, Deserialize)]
struct StatusDocument {
    #[serde(default)]
    hosts: Vec<HostDocument>,
}

#[derive(Debug, Deserialize)]
struct HostDocument {
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    services: Vec<ServiceDocument>,
}

#[derive(Debug, Deserialize)]
struct ServiceDocument {
    name: String,
    status: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    status_information: String,
    #[serde(default)]
    passive_only: bool,
    #[serde(default)]
    acknowledged: bool,
    #[serde(default)]
    in_downtime: bool,
}

fn map_state(raw: &str) -> ServiceState {
    match raw.to_ascii_uppercase().as_str() {
        "OK" | "UP" => ServiceState::Ok,
        "WARNING" => ServiceState::Warning,
        "CRITICAL" => ServiceState::Critical,
        "DOWN" | "UNREACHABLE" => ServiceState::Down,
        _ => ServiceState::Unknown,
    }
}

impl From<StatusDocument> for FetchedStatus {
    fn from(document: StatusDocument) -> Self {
        let hosts = document
            .hosts
            .into_iter()
            .map(|host| HostStatus {
                services: host
                    .services
                    .into_iter()
                    .map(|service| {
                        (
                            service.name.clone(),
                            ServiceStatus {
                                state: map_state(&service.status),
                                name: service.name,
                                duration: service.duration,
                                status_information: service.status_information,
                                passive_only: service.passive_only,
                                acknowledged: service.acknowledged,
                                in_downtime: service.in_downtime,
                            },
                        )
                    })
                    .collect::<HashMap<_, _>>(),
                name: host.name,
                address: host.address,
                fresh: true,
            })
            .collect();
        FetchedStatus { hosts }
    }
}

pub struct HttpBackend {
    base_url: String,
    /// Reused across requests; carries the fetch timeout and proxy.
    client: reqwest::Client,
    username: String,
    password: String,
}

impl HttpBackend {
    pub fn new(config: &ServerConfig) -> BackendResult<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.fetch_timeout_secs));

        if let Some(proxy) = &config.proxy {
            let mut proxy_setting = reqwest::Proxy::all(&proxy.address)
                .map_err(|e| BackendError::Configuration(format!("invalid proxy address: {e}")))?;
            if !proxy.username.is_empty() {
                proxy_setting = proxy_setting.basic_auth(&proxy.username, &proxy.password);
            }
            builder = builder.proxy(proxy_setting);
        }

        let client = builder
            .build()
            .map_err(|e| BackendError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}/{path}", self.base_url));
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }
        request
    }

    /// POST a command body; commands map failures to action errors.
    async fn post_command(&self, path: &str, body: serde_json::Value) -> BackendResult<()> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Action(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Action(format!(
                "HTTP error: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MonitorBackend for HttpBackend {
    async fn fetch_status(&self) -> BackendResult<FetchedStatus> {
        let response = self.request(reqwest::Method::GET, "status").send().await?;

        if !response.status().is_success() {
            return Err(BackendError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let document: StatusDocument = response.json().await?;
        Ok(document.into())
    }

    async fn recheck(&self, host: &str, service: Option<&str>) -> BackendResult<()> {
        self.post_command("recheck", json!({ "host": host, "service": service }))
            .await
    }

    async fn acknowledge(&self, params: &AcknowledgeParams) -> BackendResult<()> {
        self.post_command(
            "acknowledge",
            json!({
                "host": params.host,
                "service": params.service,
                "author": params.author,
                "comment": params.comment,
                "sticky": params.sticky,
                "notify": params.notify,
                "persistent_comment": params.persistent_comment,
            }),
        )
        .await
    }

    async fn set_downtime(&self, params: &DowntimeParams) -> BackendResult<()> {
        self.post_command(
            "downtime",
            json!({
                "host": params.host,
                "service": params.service,
                "author": params.author,
                "comment": params.comment,
                "fixed": params.fixed,
                "start": params.start.map(|t| t.to_rfc3339()),
                "end": params.end.map(|t| t.to_rfc3339()),
                "duration_hours": params.duration_hours,
                "duration_minutes": params.duration_minutes,
            }),
        )
        .await
    }

    async fn submit_check_result(&self, params: &SubmitResultParams) -> BackendResult<()> {
        self.post_command(
            "submit_check_result",
            json!({
                "host": params.host,
                "service": params.service,
                "state": format!("{:?}", params.state).to_uppercase(),
                "check_output": params.check_output,
                "performance_data": params.performance_data,
                "comment": params.comment,
            }),
        )
        .await
    }
}
