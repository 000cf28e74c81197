//! RefreshCoordinator - fire-and-forget "refresh everything now"
//!
//! Used by the manual refresh action and by the recheck-all coordinator
//! once its barrier settles. It never waits for any fetch: it clears the
//! freshness markers, latches a refresh request on every poller that is
//! not already mid-fetch and returns.

use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::messages::PresentationEvent;
use super::poller::PollerHandle;

#[derive(Clone)]
pub struct RefreshCoordinator {
    pollers: Vec<PollerHandle>,
    event_tx: broadcast::Sender<PresentationEvent>,
}

impl RefreshCoordinator {
    /// The coordinator only ever sees running pollers; disabled servers
    /// were never started.
    pub fn new(pollers: Vec<PollerHandle>, event_tx: broadcast::Sender<PresentationEvent>) -> Self {
        Self { pollers, event_tx }
    }

    /// Request an immediate refresh from every poller.
    ///
    /// Freshness markers are cleared first, across all servers, so the
    /// resulting fetches reveal entries that disappeared from a monitor.
    /// Pollers currently mid-fetch are skipped; their next idle tick picks
    /// the request up anyway if one is latched later.
    pub async fn trigger_refresh_all(&self) {
        debug!("refreshing all servers");

        for poller in &self.pollers {
            poller.clear_freshness().await;
        }

        for poller in &self.pollers {
            if poller.is_checking() {
                trace!(server = %poller.server_name(), "already checking, skipping");
                continue;
            }
            poller.request_refresh();
            let _ = self.event_tx.send(PresentationEvent::RefreshStarted {
                server: poller.server_name().to_string(),
            });
        }
    }
}
