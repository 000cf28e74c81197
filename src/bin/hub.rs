use std::sync::Arc;

use clap::Parser;
use statuswatch::{
    actors::{
        messages::{DisplayState, PresentationEvent},
        notification::{NotificationLoopActor, NotificationSettings},
        poller::PollerHandle,
        recheck::RecheckAllCoordinator,
        refresh::RefreshCoordinator,
    },
    backend::BackendRegistry,
    config::read_config_file,
    filters::Filters,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init(debug: bool) {
    let level = if debug {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("statuswatch", level),
        ("statuswatch_hub", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = read_config_file(&args.file)?;
    init(config.general.debug);
    trace!("started with args: {args:?}");

    let registry = BackendRegistry::default();
    let filters = Arc::new(Filters::from_config(&config.general.filters));
    let display = DisplayState::new();
    let (event_tx, event_rx) = broadcast::channel(256);

    let mut pollers = Vec::new();
    for server in &config.servers {
        if !server.enabled {
            debug!("server {} is disabled, not starting a poller", server.name);
            continue;
        }
        match registry.create(server) {
            Ok(backend) => {
                info!("starting poller for {} ({})", server.name, server.url);
                pollers.push(PollerHandle::spawn(
                    server.clone(),
                    backend,
                    filters.clone(),
                    event_tx.clone(),
                    display.clone(),
                ));
            }
            // a broken server never stops the others
            Err(e) => error!("not starting {}: {e}", server.name),
        }
    }

    let shortest_interval = config
        .servers
        .iter()
        .filter(|server| server.enabled)
        .map(|server| server.poll_interval_seconds)
        .min()
        .unwrap_or(60);
    NotificationLoopActor::spawn(
        NotificationSettings::from_general(&config.general, shortest_interval),
        event_tx.clone(),
        display.clone(),
    );

    let refresh = RefreshCoordinator::new(pollers.clone(), event_tx.clone());
    let recheck = RecheckAllCoordinator::new(pollers.clone(), refresh.clone());

    tokio::spawn(log_events(event_rx));

    info!(
        "{} pollers running; SIGUSR1 refreshes all, SIGUSR2 rechecks all",
        pollers.len()
    );

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut refresh_signal = signal(SignalKind::user_defined1())?;
        let mut recheck_signal = signal(SignalKind::user_defined2())?;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = refresh_signal.recv() => refresh.trigger_refresh_all().await,
                _ = recheck_signal.recv() => {
                    recheck.trigger();
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (&refresh, &recheck);
        tokio::signal::ctrl_c().await?;
    }

    info!("shutting down");
    for poller in &pollers {
        poller.stop();
    }

    Ok(())
}

/// Stand-in presentation sink: render every event as a log line.
async fn log_events(mut event_rx: broadcast::Receiver<PresentationEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(event) => match event {
                PresentationEvent::StatusChanged { server, snapshot } => {
                    let counts = snapshot.state_counts();
                    info!(
                        "{server}: {} hosts, {} ok / {} warning / {} critical / {} unknown / {} down",
                        snapshot.hosts.len(),
                        counts.ok,
                        counts.warning,
                        counts.critical,
                        counts.unknown,
                        counts.down
                    );
                }
                PresentationEvent::RefreshStarted { server } => debug!("{server}: refreshing"),
                PresentationEvent::Error { server, message } => warn!("{server}: {message}"),
                PresentationEvent::ErrorBanner { server, message } => {
                    warn!("ERROR {server}: {message}")
                }
                PresentationEvent::FlashTick => trace!("flash"),
                PresentationEvent::PlaySound { severity } => {
                    info!("notification sound: {severity:?}")
                }
                PresentationEvent::NotificationCleared => {
                    info!("all problems acknowledged or resolved")
                }
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event logger lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
