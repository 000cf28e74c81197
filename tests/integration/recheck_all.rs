//! Recheck-all coordination: fan-out shape, in-flight exclusivity,
//! barrier completion and the follow-up refresh.

use std::sync::Arc;
use std::time::Duration;

use statuswatch::actors::messages::{DisplayState, PresentationEvent};
use statuswatch::actors::recheck::RecheckAllCoordinator;
use statuswatch::actors::refresh::RefreshCoordinator;
use statuswatch::status::{FetchedStatus, HostStatus, ServiceState};
use tokio::sync::{Semaphore, broadcast};

use crate::helpers::*;

/// Two hosts per server: one with an active service, one with a passive
/// service. Host checks always fan out, passive services never do.
fn two_host_status() -> FetchedStatus {
    FetchedStatus {
        hosts: vec![
            HostStatus::new("h1", "10.0.0.1").with_service(service("ACTIVE", ServiceState::Warning)),
            HostStatus::new("h2", "10.0.0.2")
                .with_service(passive_service("PASSIVE", ServiceState::Critical)),
        ],
    }
}

struct Setup {
    alpha: Arc<MockBackend>,
    beta: Arc<MockBackend>,
    coordinator: RecheckAllCoordinator,
}

fn set_up(event_tx: &broadcast::Sender<PresentationEvent>) -> Setup {
    let display = DisplayState::new();
    let alpha = MockBackend::new(two_host_status());
    let beta = MockBackend::new(two_host_status());

    let pollers = spawn_enabled_pollers(
        vec![
            (server_config("alpha", 3600, true), alpha.clone()),
            (server_config("beta", 3600, true), beta.clone()),
        ],
        event_tx,
        &display,
    );

    let refresh = RefreshCoordinator::new(pollers.clone(), event_tx.clone());
    let coordinator = RecheckAllCoordinator::new(pollers, refresh);

    Setup {
        alpha,
        beta,
        coordinator,
    }
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_excludes_passive_services() {
    let (event_tx, _rx) = broadcast::channel(256);
    let setup = set_up(&event_tx);

    // snapshots must be populated before the fan-out can enumerate them
    wait_until(|| setup.alpha.fetch_count() == 1 && setup.beta.fetch_count() == 1).await;

    assert!(setup.coordinator.trigger());

    // 2 servers x (2 host checks + 1 active service) = 6 tasks, and the
    // passive service never shows up as a 7th
    wait_until(|| setup.alpha.recheck_calls().len() + setup.beta.recheck_calls().len() == 6).await;
    wait_until(|| !setup.coordinator.is_in_flight()).await;

    for backend in [&setup.alpha, &setup.beta] {
        let calls = backend.recheck_calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.contains(&("h1".to_string(), None)));
        assert!(calls.contains(&("h2".to_string(), None)));
        assert!(calls.contains(&("h1".to_string(), Some("ACTIVE".to_string()))));
        assert!(
            calls.iter().all(|(_, service)| service.as_deref() != Some("PASSIVE")),
            "passive services must not be rechecked"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_trigger_while_in_flight_is_a_noop() {
    let (event_tx, _rx) = broadcast::channel(256);
    let setup = set_up(&event_tx);

    wait_until(|| setup.alpha.fetch_count() == 1 && setup.beta.fetch_count() == 1).await;

    // hold the fan-out open: no recheck can finish until permits arrive
    let gate = Arc::new(Semaphore::new(0));
    setup.alpha.gate_rechecks(gate.clone());
    setup.beta.gate_rechecks(gate.clone());

    assert!(setup.coordinator.trigger());
    wait_until(|| setup.coordinator.is_in_flight()).await;

    // second trigger is observed and dropped, not queued
    assert!(!setup.coordinator.trigger());
    assert!(setup.coordinator.is_in_flight());

    gate.add_permits(64);
    wait_until(|| !setup.coordinator.is_in_flight()).await;

    // the dropped trigger produced no second task set
    assert_eq!(setup.alpha.recheck_calls().len(), 3);
    assert_eq!(setup.beta.recheck_calls().len(), 3);

    // once finished, a new run may start
    assert!(setup.coordinator.trigger());
    wait_until(|| !setup.coordinator.is_in_flight()).await;
}

#[tokio::test(start_paused = true)]
async fn test_barrier_completion_refreshes_all_servers_once() {
    let (event_tx, _rx) = broadcast::channel(256);
    let setup = set_up(&event_tx);

    wait_until(|| setup.alpha.fetch_count() == 1 && setup.beta.fetch_count() == 1).await;

    assert!(setup.coordinator.trigger());
    wait_until(|| !setup.coordinator.is_in_flight()).await;

    // exactly one follow-up refresh per server after the settle delay
    wait_until(|| setup.alpha.fetch_count() == 2 && setup.beta.fetch_count() == 2).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(setup.alpha.fetch_count(), 2);
    assert_eq!(setup.beta.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_bulk_capable_backend_gets_one_call() {
    let (event_tx, _rx) = broadcast::channel(256);
    let display = DisplayState::new();

    let bulk = MockBackend::bulk_capable(two_host_status());
    let plain = MockBackend::new(two_host_status());

    let pollers = spawn_enabled_pollers(
        vec![
            (server_config("bulk", 3600, true), bulk.clone()),
            (server_config("plain", 3600, true), plain.clone()),
        ],
        &event_tx,
        &display,
    );

    wait_until(|| bulk.fetch_count() == 1 && plain.fetch_count() == 1).await;

    let refresh = RefreshCoordinator::new(pollers.clone(), event_tx.clone());
    let coordinator = RecheckAllCoordinator::new(pollers, refresh);

    assert!(coordinator.trigger());
    wait_until(|| !coordinator.is_in_flight()).await;

    use std::sync::atomic::Ordering;
    assert_eq!(bulk.bulk_rechecks.load(Ordering::SeqCst), 1);
    assert!(bulk.recheck_calls().is_empty());
    assert_eq!(plain.recheck_calls().len(), 3);
    assert_eq!(plain.bulk_rechecks.load(Ordering::SeqCst), 0);
}
