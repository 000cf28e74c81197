//! Presentation events and shared display flags
//!
//! The engine talks to the presentation surface through a single
//! `tokio::sync::broadcast` channel of [`PresentationEvent`]s. Sends are
//! fire-and-forget: the sink subscribes when it likes, marshals onto its
//! own event loop, and may lag without ever blocking a poller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::status::{ServiceState, StatusSnapshot};

/// Event published to the presentation surface
#[derive(Debug, Clone)]
pub enum PresentationEvent {
    /// A poller applied a fresh status snapshot. Carries a copy; the
    /// receiver never touches the poller's own state.
    StatusChanged {
        server: String,
        snapshot: StatusSnapshot,
    },

    /// A refresh began for this server, either on interval or on request.
    RefreshStarted { server: String },

    /// A status fetch failed. Non-fatal; the poller keeps retrying.
    Error { server: String, message: String },

    /// One poller won the error announcement slot; show its message
    /// prominently.
    ErrorBanner { server: String, message: String },

    /// Visual flash pulse while unacknowledged problems exist.
    FlashTick,

    /// The sink should play the notification sound for this severity.
    PlaySound { severity: ServiceState },

    /// Nothing alerting remains; restore the default display.
    NotificationCleared,
}

/// Flags shared between loops that would otherwise trample the same
/// display surface.
///
/// Many pollers failing at once (a dropped network link) must not all
/// announce their error at the same moment, and the notification flash
/// pauses while an error banner is up. One flag, single winner.
#[derive(Debug, Default)]
pub struct DisplayState {
    error_banner: AtomicBool,
}

impl DisplayState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the error announcement slot. First caller wins; returns
    /// false while another announcement is running.
    pub fn try_claim_error_banner(&self) -> bool {
        !self.error_banner.swap(true, Ordering::SeqCst)
    }

    pub fn release_error_banner(&self) {
        self.error_banner.store(false, Ordering::SeqCst);
    }

    pub fn error_banner_shown(&self) -> bool {
        self.error_banner.load(Ordering::SeqCst)
    }
}
