//! RecheckAllCoordinator - bulk "recheck everything" with a barrier
//!
//! One user action fans out into a burst of short-lived tasks: one per
//! host and one per non-passive service, across every enabled server.
//! Backends that can re-evaluate everything in a single call get exactly
//! one bulk call instead.
//!
//! Only one recheck-all may run at a time, process-wide. A second trigger
//! while one is in flight is an observed no-op, not a queued request.
//! Completion of the fan-out is detected by watching the task handles, so
//! a task that dies without reporting anything still releases the barrier.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::backend::error::BackendResult;

use super::poller::PollerHandle;
use super::refresh::RefreshCoordinator;

/// How often the barrier looks at the outstanding tasks.
const BARRIER_POLL: Duration = Duration::from_secs(1);

/// Grace period after the barrier so the monitors can apply the recheck
/// requests before the follow-up refresh would read stale results.
const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Resets the in-flight flag when the run ends, however it ends - a
/// failure inside the fan-out must never wedge future recheck-alls.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct RecheckAllCoordinator {
    pollers: Vec<PollerHandle>,
    refresh: RefreshCoordinator,
    in_flight: Arc<AtomicBool>,
}

impl RecheckAllCoordinator {
    pub fn new(pollers: Vec<PollerHandle>, refresh: RefreshCoordinator) -> Self {
        Self {
            pollers,
            refresh,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a recheck-all run in the background.
    ///
    /// Returns false without doing anything when a run is already in
    /// flight.
    pub fn trigger(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("already rechecking all services on all hosts on all servers");
            return false;
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            let _guard = InFlightGuard(coordinator.in_flight.clone());
            coordinator.run().await;
        });
        true
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn run(&self) {
        debug!("rechecking all services on all hosts on all servers");

        let mut rechecks: HashMap<String, JoinHandle<BackendResult<()>>> = HashMap::new();

        for poller in &self.pollers {
            let server = poller.server_name();

            if poller.supports_bulk_recheck() {
                // one call replaces the whole per-item fan-out
                rechecks.insert(server.to_string(), poller.spawn_bulk_recheck());
                continue;
            }

            let snapshot = poller.snapshot().await;
            for host in snapshot.hosts.values() {
                rechecks.insert(
                    format!("{server}: {}", host.name),
                    poller.spawn_recheck(&host.name, None),
                );
                for service in host.services.values() {
                    if service.passive_only {
                        continue;
                    }
                    rechecks.insert(
                        format!("{server}: {}: {}", host.name, service.name),
                        poller.spawn_recheck(&host.name, Some(&service.name)),
                    );
                }
            }
        }

        // barrier: a recheck leaves the set once its task is observed
        // finished; success or failure makes no difference here
        loop {
            rechecks.retain(|_, task| !task.is_finished());
            if rechecks.is_empty() {
                break;
            }
            trace!("{} rechecks still pending", rechecks.len());
            tokio::time::sleep(BARRIER_POLL).await;
        }

        debug!("all rechecks done");

        tokio::time::sleep(SETTLE_DELAY).await;
        self.refresh.trigger_refresh_all().await;
    }
}
