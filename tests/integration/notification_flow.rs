//! End-to-end notification flow: poller snapshots drive the notification
//! loop through the shared event stream.

use statuswatch::actors::messages::{DisplayState, PresentationEvent};
use statuswatch::actors::notification::{NotificationLoopActor, NotificationSettings};
use statuswatch::status::ServiceState;
use tokio::sync::broadcast;

use crate::helpers::*;

fn settings(poll_interval_seconds: u64) -> NotificationSettings {
    NotificationSettings {
        flashing: true,
        sound: true,
        sound_repeat: true,
        poll_interval_seconds,
    }
}

#[tokio::test(start_paused = true)]
async fn test_critical_service_rings_and_recovery_clears() {
    let (event_tx, mut rx) = broadcast::channel(512);
    let display = DisplayState::new();

    let backend = MockBackend::new(one_host_status(
        "web01",
        vec![service("HTTP", ServiceState::Critical)],
    ));

    let _pollers = spawn_enabled_pollers(
        vec![(server_config("prod", 5, true), backend.clone())],
        &event_tx,
        &display,
    );
    NotificationLoopActor::spawn(settings(5), event_tx.clone(), display.clone());

    // the first poll surfaces the problem: sound with the right severity,
    // flashing underway
    let sound = wait_for_event(&mut rx, |e| {
        matches!(e, PresentationEvent::PlaySound { .. })
    })
    .await;
    match sound {
        PresentationEvent::PlaySound { severity } => assert_eq!(severity, ServiceState::Critical),
        _ => unreachable!(),
    }
    wait_for_event(&mut rx, |e| matches!(e, PresentationEvent::FlashTick)).await;

    // the service recovers; the next poll clears the notification
    backend.set_status(one_host_status(
        "web01",
        vec![service("HTTP", ServiceState::Ok)],
    ));

    wait_for_event(&mut rx, |e| {
        matches!(e, PresentationEvent::NotificationCleared)
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_acknowledged_problem_stops_the_noise() {
    let (event_tx, mut rx) = broadcast::channel(512);
    let display = DisplayState::new();

    let backend = MockBackend::new(one_host_status(
        "db01",
        vec![service("MySQL", ServiceState::Down)],
    ));

    let _pollers = spawn_enabled_pollers(
        vec![(server_config("prod", 5, true), backend.clone())],
        &event_tx,
        &display,
    );
    NotificationLoopActor::spawn(settings(5), event_tx.clone(), display.clone());

    wait_for_event(&mut rx, |e| {
        matches!(e, PresentationEvent::PlaySound { severity } if *severity == ServiceState::Down)
    })
    .await;

    // operator acknowledges on the monitor; the next fetch reflects it
    let mut acked = service("MySQL", ServiceState::Down);
    acked.acknowledged = true;
    backend.set_status(one_host_status("db01", vec![acked]));

    wait_for_event(&mut rx, |e| {
        matches!(e, PresentationEvent::NotificationCleared)
    })
    .await;

    // quiet afterwards: no further sound or flashing
    let mut extra_noise = 0;
    for _ in 0..50 {
        match rx.try_recv() {
            Ok(PresentationEvent::PlaySound { .. }) | Ok(PresentationEvent::FlashTick) => {
                extra_noise += 1;
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert_eq!(extra_noise, 0);
}
