//! Poller lifecycle scenarios: startup, disabled servers, isolation of
//! failing servers, single fetch in flight per server.

use std::sync::atomic::Ordering;
use std::time::Duration;

use statuswatch::actors::messages::{DisplayState, PresentationEvent};
use statuswatch::status::{ConnectionState, FetchedStatus, ServiceState};
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_disabled_server_never_produces_events() {
    let (event_tx, mut rx) = broadcast::channel(256);
    let display = DisplayState::new();

    let alpha = MockBackend::new(one_host_status("a1", vec![service("PING", ServiceState::Ok)]));
    let beta = MockBackend::new(one_host_status("b1", vec![service("PING", ServiceState::Ok)]));
    let gamma = MockBackend::new(one_host_status("c1", vec![service("PING", ServiceState::Ok)]));

    let pollers = spawn_enabled_pollers(
        vec![
            (server_config("alpha", 5, true), alpha.clone()),
            (server_config("beta", 5, false), beta.clone()),
            (server_config("gamma", 5, true), gamma.clone()),
        ],
        &event_tx,
        &display,
    );

    // 3 servers configured, 1 disabled -> exactly 2 pollers
    assert_eq!(pollers.len(), 2);

    // let several poll cycles pass; the disabled server stays silent
    for _ in 0..10 {
        let event = timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("no event")
            .expect("channel closed");
        if let PresentationEvent::StatusChanged { server, .. }
        | PresentationEvent::RefreshStarted { server }
        | PresentationEvent::Error { server, .. } = event
        {
            assert_ne!(server, "beta");
        }
    }
    assert_eq!(beta.fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_server_does_not_affect_the_others() {
    let (event_tx, mut rx) = broadcast::channel(256);
    let display = DisplayState::new();

    let healthy =
        MockBackend::new(one_host_status("web01", vec![service("HTTP", ServiceState::Ok)]));
    let broken = MockBackend::new(FetchedStatus::default());
    broken.set_failure(Some("connection refused"));

    let pollers = spawn_enabled_pollers(
        vec![
            (server_config("healthy", 5, true), healthy.clone()),
            (server_config("broken", 5, true), broken.clone()),
        ],
        &event_tx,
        &display,
    );

    wait_for_event(&mut rx, |e| {
        matches!(e, PresentationEvent::Error { server, message }
            if server == "broken" && message == "connection refused")
    })
    .await;

    // the healthy poller keeps its cadence while the broken one cools down
    wait_until(|| healthy.fetch_count() >= 4).await;

    // the broken poller ends up idle again with its error text preserved
    let broken_poller = pollers
        .iter()
        .find(|p| p.server_name() == "broken")
        .unwrap();
    timeout(Duration::from_secs(300), async {
        loop {
            let snapshot = broken_poller.snapshot().await;
            if snapshot.connection_state == ConnectionState::Idle {
                assert_eq!(snapshot.error_message, "connection refused");
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
    .await
    .expect("broken poller never returned to idle");
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_fetch_in_flight_per_server() {
    let (event_tx, _rx) = broadcast::channel(256);
    let display = DisplayState::new();

    let backend =
        MockBackend::new(one_host_status("web01", vec![service("HTTP", ServiceState::Ok)]));
    backend.set_fetch_delay(Some(Duration::from_secs(3)));

    let pollers = spawn_enabled_pollers(
        vec![(server_config("slow", 1, true), backend.clone())],
        &event_tx,
        &display,
    );
    let poller = &pollers[0];

    // hammer refresh requests while fetches take longer than the interval
    for _ in 0..30 {
        poller.request_refresh();
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    wait_until(|| backend.fetch_count() >= 3).await;
    assert_eq!(backend.max_concurrent_fetches.load(Ordering::SeqCst), 1);
}
