//! NotificationLoopActor - flash and sound cadence for open problems
//!
//! Subscribes to the presentation event stream, tracks which services are
//! alerting and unacknowledged, and while any remain drives a fast tick
//! (0.5 s) that is completely decoupled from the poll cadence:
//!
//! - a visual flash pulse every tick, unless an error banner is up
//! - the notification sound immediately, then again every
//!   `2 x poll interval` ticks while something is still unacknowledged
//!
//! The loop goes idle the moment nothing alerting remains (everything
//! recovered, acknowledged, or put into downtime) and tells the sink to
//! restore its default display.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::GeneralConfig;
use crate::status::{ServiceState, StatusSnapshot};

use super::messages::{DisplayState, PresentationEvent};

const NOTIFICATION_TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub flashing: bool,
    pub sound: bool,
    pub sound_repeat: bool,
    /// Poll interval the sound replay threshold derives from.
    pub poll_interval_seconds: u64,
}

impl NotificationSettings {
    pub fn from_general(general: &GeneralConfig, poll_interval_seconds: u64) -> Self {
        Self {
            flashing: general.flashing,
            sound: general.notification_sound,
            sound_repeat: general.notification_sound_repeat,
            poll_interval_seconds,
        }
    }
}

/// Sound pacing: fire on the first tick, then hold off until the counter
/// reaches twice the poll interval while something is still
/// unacknowledged.
#[derive(Debug)]
struct SoundGate {
    counter: u64,
    repeat: bool,
    replay_after: u64,
}

impl SoundGate {
    fn new(repeat: bool, poll_interval_seconds: u64) -> Self {
        Self {
            counter: 0,
            repeat,
            replay_after: 2 * poll_interval_seconds,
        }
    }

    fn reset(&mut self) {
        self.counter = 0;
    }

    /// Returns true when the sound should play on this tick.
    fn on_tick(&mut self, unacknowledged: usize) -> bool {
        if self.counter == 0 {
            self.counter = 1;
            return true;
        }
        if self.repeat && self.counter >= self.replay_after && unacknowledged > 0 {
            self.counter = 1;
            return true;
        }
        self.counter += 1;
        false
    }
}

pub struct NotificationLoopActor {
    settings: NotificationSettings,
    event_rx: broadcast::Receiver<PresentationEvent>,
    event_tx: broadcast::Sender<PresentationEvent>,
    display: Arc<DisplayState>,
    active: bool,
    /// "server: host: service" -> current state, for everything alerting
    /// and not acknowledged or in downtime.
    unacknowledged: HashMap<String, ServiceState>,
    sound: SoundGate,
}

impl NotificationLoopActor {
    /// Subscribe to the event stream and run the loop as its own task.
    pub fn spawn(
        settings: NotificationSettings,
        event_tx: broadcast::Sender<PresentationEvent>,
        display: Arc<DisplayState>,
    ) -> JoinHandle<()> {
        let sound = SoundGate::new(settings.sound_repeat, settings.poll_interval_seconds);
        let actor = Self {
            event_rx: event_tx.subscribe(),
            event_tx,
            display,
            settings,
            active: false,
            unacknowledged: HashMap::new(),
            sound,
        };
        tokio::spawn(actor.run())
    }

    async fn run(mut self) {
        debug!("starting notification loop");

        let mut ticker = tokio::time::interval(NOTIFICATION_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = self.event_rx.recv() => {
                    match result {
                        Ok(PresentationEvent::StatusChanged { server, snapshot }) => {
                            self.observe(&server, &snapshot);
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("notification loop lagged, skipped {skipped} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("event channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = ticker.tick(), if self.active => {
                    self.on_tick();
                }
            }
        }

        debug!("notification loop stopped");
    }

    /// Fold a fresh snapshot into the unacknowledged set. A service that
    /// recovered, got acknowledged or entered downtime leaves the set; a
    /// service alerting for the first time activates the loop.
    fn observe(&mut self, server: &str, snapshot: &StatusSnapshot) {
        let prefix = format!("{server}: ");

        let fresh: HashMap<String, ServiceState> = snapshot
            .alerting_services()
            .into_iter()
            .map(|(host, service, state)| (format!("{server}: {host}: {service}"), state))
            .collect();

        self.unacknowledged
            .retain(|key, _| !key.starts_with(&prefix) || fresh.contains_key(key));

        let mut newly_alerting = false;
        for (key, state) in fresh {
            if self.unacknowledged.insert(key, state).is_none() {
                newly_alerting = true;
            }
        }

        if newly_alerting && !self.active {
            debug!(
                "{} unacknowledged events, notification loop active",
                self.unacknowledged.len()
            );
            self.active = true;
            self.sound.reset();
        }
    }

    fn on_tick(&mut self) {
        if self.unacknowledged.is_empty() {
            debug!("no unacknowledged events remain, notification loop idle");
            self.active = false;
            self.sound.reset();
            let _ = self.event_tx.send(PresentationEvent::NotificationCleared);
            return;
        }

        if self.settings.flashing && !self.display.error_banner_shown() {
            let _ = self.event_tx.send(PresentationEvent::FlashTick);
        }

        if self.settings.sound && self.sound.on_tick(self.unacknowledged.len()) {
            let Some(severity) = self
                .unacknowledged
                .values()
                .max_by_key(|state| state.severity())
                .copied()
            else {
                return;
            };
            let _ = self.event_tx.send(PresentationEvent::PlaySound { severity });
        }
    }
}
