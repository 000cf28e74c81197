//! ServerPollerActor - one autonomous refresh loop per enabled server
//!
//! Each enabled server gets its own poller task, started at application
//! startup and stopped cooperatively. The loop wakes once per second,
//! counts ticks against the configured poll interval and refreshes when
//! the interval elapses or a refresh was requested from outside.
//!
//! ## Tick policy
//!
//! ```text
//! tick (1s) -> hook() -> count += 1
//!     count >= interval OR refresh requested?
//!         mid-fetch          -> skip, count again next tick
//!         otherwise          -> clear latch, reset count, refresh
//! ```
//!
//! A refresh request arriving while a fetch is in flight stays latched
//! and is honored on the next idle tick - never dropped, never doubled
//! into a concurrent fetch.
//!
//! ## Error policy
//!
//! A failed fetch marks the snapshot `Error`, emits an error event, and
//! cools down before tick counting resumes. Only one poller at a time
//! runs the announcement sequence (pause, banner, pause) so a dead
//! network does not turn into a storm of simultaneous banners. Errors
//! are never fatal; the loop retries until stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, trace, warn};

use crate::backend::error::BackendResult;
use crate::backend::{AcknowledgeParams, DowntimeParams, MonitorBackend, SubmitResultParams};
use crate::config::ServerConfig;
use crate::filters::Filters;
use crate::status::{ConnectionState, StatusSnapshot};

use super::messages::{DisplayState, PresentationEvent};

/// Base cadence of the poll loop.
const TICK: Duration = Duration::from_secs(1);

/// Pause before and after a winning error announcement.
const ERROR_ANNOUNCE_PAUSE: Duration = Duration::from_secs(5);

/// Cool-down after a failed fetch before tick counting resumes.
const ERROR_COOLDOWN: Duration = Duration::from_secs(10);

/// Strip characters that upset status displays; backends can return
/// markup fragments or multi-line bodies in their error text.
fn sanitize_error(message: &str) -> String {
    message.replace(['<', '>'], "").replace('\n', " ")
}

pub struct ServerPollerActor {
    config: ServerConfig,
    backend: Arc<dyn MonitorBackend>,
    snapshot: Arc<RwLock<StatusSnapshot>>,
    filters: Arc<Filters>,
    event_tx: broadcast::Sender<PresentationEvent>,
    display: Arc<DisplayState>,
    refresh_requested: Arc<AtomicBool>,
    is_checking: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    tick_count: u64,
}

impl ServerPollerActor {
    /// Run the poll loop until the stop flag is raised.
    #[instrument(skip(self), fields(server = %self.config.name))]
    pub async fn run(mut self) {
        debug!(
            "starting poller with interval {}s",
            self.config.poll_interval_seconds
        );

        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.stopped.load(Ordering::SeqCst) {
            ticker.tick().await;
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }

            // per-tick backend hook (keep-alive and the like); its failures
            // must not touch the refresh cycle
            if let Err(e) = self.backend.hook().await {
                trace!("tick hook failed: {e}");
            }

            self.tick_count += 1;
            if self.tick_count >= self.config.poll_interval_seconds
                || self.refresh_requested.load(Ordering::SeqCst)
            {
                if self.is_checking.load(Ordering::SeqCst) {
                    // a fetch is already running; this tick counts again
                    continue;
                }
                self.refresh_requested.store(false, Ordering::SeqCst);
                self.tick_count = 0;
                self.refresh().await;
            }
        }

        debug!("poller stopped");
    }

    async fn refresh(&mut self) {
        self.is_checking.store(true, Ordering::SeqCst);

        {
            let mut snapshot = self.snapshot.write().await;
            snapshot.connection_state = ConnectionState::Refreshing;
        }
        self.emit(PresentationEvent::RefreshStarted {
            server: self.config.name.clone(),
        });

        let error = match self.backend.fetch_status().await {
            Ok(fetched) => {
                trace!("fetched {} hosts", fetched.hosts.len());
                let copy = {
                    let mut snapshot = self.snapshot.write().await;
                    snapshot.apply(fetched, &self.filters);
                    snapshot.clone()
                };
                self.emit(PresentationEvent::StatusChanged {
                    server: self.config.name.clone(),
                    snapshot: copy,
                });
                None
            }
            Err(e) => {
                warn!("status fetch failed: {e}");
                let message = sanitize_error(e.message());
                {
                    let mut snapshot = self.snapshot.write().await;
                    snapshot.connection_state = ConnectionState::Error;
                    snapshot.error_message = message.clone();
                }
                self.emit(PresentationEvent::Error {
                    server: self.config.name.clone(),
                    message: message.clone(),
                });
                Some(message)
            }
        };

        // the fetch itself is over; refresh requests arriving from here on
        // are honored on the next idle tick
        self.is_checking.store(false, Ordering::SeqCst);

        if let Some(message) = error {
            self.announce_error(message).await;
        }
    }

    /// Announce the error if no other poller currently is, then cool down.
    async fn announce_error(&self, message: String) {
        if self.display.try_claim_error_banner() {
            tokio::time::sleep(ERROR_ANNOUNCE_PAUSE).await;
            self.emit(PresentationEvent::ErrorBanner {
                server: self.config.name.clone(),
                message,
            });
            tokio::time::sleep(ERROR_ANNOUNCE_PAUSE).await;
            self.display.release_error_banner();
        }

        tokio::time::sleep(ERROR_COOLDOWN).await;

        let mut snapshot = self.snapshot.write().await;
        snapshot.connection_state = ConnectionState::Idle;
    }

    fn emit(&self, event: PresentationEvent) {
        // no subscribers is fine; the sink attaches on its own schedule
        let _ = self.event_tx.send(event);
    }
}

/// Handle for one running server poller
///
/// Cheap to clone; coordinators keep a handle per enabled server. All
/// control goes through latched flags so a burst of identical requests
/// collapses into one.
#[derive(Clone)]
pub struct PollerHandle {
    server_name: String,
    backend: Arc<dyn MonitorBackend>,
    snapshot: Arc<RwLock<StatusSnapshot>>,
    refresh_requested: Arc<AtomicBool>,
    is_checking: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl PollerHandle {
    /// Spawn the poll loop for one server. The first pass fetches
    /// immediately; afterwards the configured interval takes over.
    pub fn spawn(
        config: ServerConfig,
        backend: Arc<dyn MonitorBackend>,
        filters: Arc<Filters>,
        event_tx: broadcast::Sender<PresentationEvent>,
        display: Arc<DisplayState>,
    ) -> Self {
        let snapshot = Arc::new(RwLock::new(StatusSnapshot::new()));
        let refresh_requested = Arc::new(AtomicBool::new(true));
        let is_checking = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));

        let handle = Self {
            server_name: config.name.clone(),
            backend: backend.clone(),
            snapshot: snapshot.clone(),
            refresh_requested: refresh_requested.clone(),
            is_checking: is_checking.clone(),
            stopped: stopped.clone(),
        };

        let actor = ServerPollerActor {
            config,
            backend,
            snapshot,
            filters,
            event_tx,
            display,
            refresh_requested,
            is_checking,
            stopped,
            tick_count: 0,
        };

        tokio::spawn(actor.run());

        handle
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Whether a fetch is in flight right now.
    pub fn is_checking(&self) -> bool {
        self.is_checking.load(Ordering::SeqCst)
    }

    /// Latch a refresh request; honored on the next idle tick.
    pub fn request_refresh(&self) {
        self.refresh_requested.store(true, Ordering::SeqCst);
    }

    /// Raise the cooperative stop flag; the loop exits on its next tick.
    /// An in-flight fetch is left to finish.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Immutable copy of the current snapshot.
    pub async fn snapshot(&self) -> StatusSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Drop freshness markers ahead of a global refresh pass.
    pub async fn clear_freshness(&self) {
        self.snapshot.write().await.clear_freshness();
    }

    pub fn supports_bulk_recheck(&self) -> bool {
        self.backend.supports_bulk_recheck()
    }

    /// Re-run a single host or service check as an independent task.
    /// Does not touch the poll cycle or `is_checking`.
    pub fn spawn_recheck(&self, host: &str, service: Option<&str>) -> JoinHandle<BackendResult<()>> {
        let backend = self.backend.clone();
        let server = self.server_name.clone();
        let host = host.to_string();
        let service = service.map(String::from);
        tokio::spawn(async move {
            let result = backend.recheck(&host, service.as_deref()).await;
            if let Err(e) = &result {
                warn!(server = %server, host = %host, "recheck failed: {e}");
            }
            result
        })
    }

    /// Issue the backend's single bulk recheck call as an independent task.
    pub fn spawn_bulk_recheck(&self) -> JoinHandle<BackendResult<()>> {
        let backend = self.backend.clone();
        let server = self.server_name.clone();
        tokio::spawn(async move {
            let result = backend.bulk_recheck_all().await;
            if let Err(e) = &result {
                warn!(server = %server, "bulk recheck failed: {e}");
            }
            result
        })
    }

    pub fn spawn_acknowledge(&self, params: AcknowledgeParams) -> JoinHandle<BackendResult<()>> {
        let backend = self.backend.clone();
        let server = self.server_name.clone();
        tokio::spawn(async move {
            let result = backend.acknowledge(&params).await;
            if let Err(e) = &result {
                warn!(server = %server, host = %params.host, "acknowledge failed: {e}");
            }
            result
        })
    }

    pub fn spawn_downtime(&self, params: DowntimeParams) -> JoinHandle<BackendResult<()>> {
        let backend = self.backend.clone();
        let server = self.server_name.clone();
        tokio::spawn(async move {
            let result = backend.set_downtime(&params).await;
            if let Err(e) = &result {
                warn!(server = %server, host = %params.host, "downtime failed: {e}");
            }
            result
        })
    }

    pub fn spawn_submit_check_result(
        &self,
        params: SubmitResultParams,
    ) -> JoinHandle<BackendResult<()>> {
        let backend = self.backend.clone();
        let server = self.server_name.clone();
        tokio::spawn(async move {
            let result = backend.submit_check_result(&params).await;
            if let Err(e) = &result {
                warn!(server = %server, host = %params.host, "submit check result failed: {e}");
            }
            result
        })
    }
}
