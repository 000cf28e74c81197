//! Monitor backend trait and registry
//!
//! Every configured server talks to its monitoring system through a
//! [`MonitorBackend`]. The trait hides the vendor protocol completely:
//! the engine only ever asks for a status fetch or issues one of the
//! user commands. New vendor types plug in at runtime through the
//! [`BackendRegistry`], a map from type tag to factory.
//!
//! ## Thread Safety
//!
//! Implementations must be `Send + Sync`; a backend handle is shared
//! between the owning poller and short-lived command tasks.

pub mod error;
pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::ServerConfig;
use crate::status::{FetchedStatus, ServiceState};

use error::{BackendError, BackendResult};

/// Parameters for acknowledging a host or service problem.
#[derive(Debug, Clone)]
pub struct AcknowledgeParams {
    pub host: String,
    /// None acknowledges the host itself.
    pub service: Option<String>,
    pub author: String,
    pub comment: String,
    /// Keep the acknowledgement across state changes.
    pub sticky: bool,
    pub notify: bool,
    pub persistent_comment: bool,
}

/// Parameters for scheduling a downtime window.
#[derive(Debug, Clone)]
pub struct DowntimeParams {
    pub host: String,
    pub service: Option<String>,
    pub author: String,
    pub comment: String,
    /// Fixed windows use start/end; flexible ones use the duration.
    pub fixed: bool,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration_hours: u32,
    pub duration_minutes: u32,
}

/// Parameters for submitting a passive check result.
#[derive(Debug, Clone)]
pub struct SubmitResultParams {
    pub host: String,
    pub service: Option<String>,
    pub state: ServiceState,
    pub check_output: String,
    pub performance_data: String,
    pub comment: String,
}

/// One server's monitoring connection.
///
/// `fetch_status` is called by the owning poller only, so implementations
/// never see concurrent fetches for the same server. Command methods run
/// from independent short-lived tasks and may overlap with a fetch.
#[async_trait]
pub trait MonitorBackend: Send + Sync {
    /// Fetch the complete host/service status from the monitor.
    async fn fetch_status(&self) -> BackendResult<FetchedStatus>;

    /// Ask the monitor to re-run the checks for a host, or for one of its
    /// services when given.
    async fn recheck(&self, host: &str, service: Option<&str>) -> BackendResult<()>;

    async fn acknowledge(&self, params: &AcknowledgeParams) -> BackendResult<()>;

    async fn set_downtime(&self, params: &DowntimeParams) -> BackendResult<()>;

    async fn submit_check_result(&self, params: &SubmitResultParams) -> BackendResult<()>;

    /// Whether the monitor can re-evaluate everything with a single call.
    /// Probed by the recheck-all coordinator, which then issues one
    /// [`MonitorBackend::bulk_recheck_all`] instead of the per-item fan-out.
    fn supports_bulk_recheck(&self) -> bool {
        false
    }

    /// Issue the single bulk recheck call. Only meaningful when
    /// [`MonitorBackend::supports_bulk_recheck`] returns true.
    async fn bulk_recheck_all(&self) -> BackendResult<()> {
        Err(BackendError::Action(
            "bulk recheck not supported by this backend".to_string(),
        ))
    }

    /// Low-cost per-tick hook for things like session keep-alive. Called
    /// every poller tick; failures are logged by the caller and never
    /// affect the refresh cycle.
    async fn hook(&self) -> BackendResult<()> {
        Ok(())
    }
}

type BackendFactory =
    Box<dyn Fn(&ServerConfig) -> BackendResult<Arc<dyn MonitorBackend>> + Send + Sync>;

/// Runtime-pluggable map from server type tag to backend factory.
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// An empty registry, for callers that bring their own backend types.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in backend types registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("http", |config| {
            Ok(Arc::new(http::HttpBackend::new(config)?) as Arc<dyn MonitorBackend>)
        });
        registry
    }

    /// Register a backend type. The first registration of a tag wins;
    /// later duplicates are ignored.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(&ServerConfig) -> BackendResult<Arc<dyn MonitorBackend>> + Send + Sync + 'static,
    {
        self.factories
            .entry(kind.to_string())
            .or_insert_with(|| Box::new(factory));
    }

    pub fn registered_kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the backend for a server config. Unknown type tags fail fast
    /// so the server is never started.
    pub fn create(&self, config: &ServerConfig) -> BackendResult<Arc<dyn MonitorBackend>> {
        match self.factories.get(&config.kind) {
            Some(factory) => factory(config),
            None => Err(BackendError::Configuration(format!(
                "server type not supported: {}",
                config.kind
            ))),
        }
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
