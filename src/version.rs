//! Latest-version lookup over the configured servers' connections.
//!
//! Rather than opening its own connection, the version check borrows
//! whichever server connection is free: the first task to claim a probe's
//! in-use flag performs the lookup, everyone else skips it. On a
//! successful fetch all flags are reset and the result reported; on a
//! failed one the next connection is tried.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

/// One server connection able to fetch the published latest-version
/// string. The HTTP call itself lives with the backend/presentation
/// layer; the engine only coordinates who performs it.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    async fn fetch_latest_version(&self) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    Latest,
    OutOfDate { latest: String },
}

struct ProbeSlot {
    probe: Arc<dyn VersionProbe>,
    in_use: AtomicBool,
}

pub struct VersionCheck {
    probes: Vec<ProbeSlot>,
}

impl VersionCheck {
    pub fn new(probes: Vec<Arc<dyn VersionProbe>>) -> Self {
        Self {
            probes: probes
                .into_iter()
                .map(|probe| ProbeSlot {
                    probe,
                    in_use: AtomicBool::new(false),
                })
                .collect(),
        }
    }

    /// Compare the running version against the published one.
    ///
    /// Returns None when no connection produced an answer. Concurrent
    /// checks never share a connection: whoever flips a slot's in-use
    /// flag first owns it until the check resolves.
    pub async fn check(&self, current_version: &str) -> Option<VersionStatus> {
        for slot in &self.probes {
            if slot.in_use.swap(true, Ordering::SeqCst) {
                // connection busy with another check
                continue;
            }
            match slot.probe.fetch_latest_version().await {
                Ok(raw) => {
                    let latest = raw.lines().next().unwrap_or("").trim().to_string();
                    for slot in &self.probes {
                        slot.in_use.store(false, Ordering::SeqCst);
                    }
                    debug!("latest published version: {latest}");
                    return Some(if latest == current_version {
                        VersionStatus::Latest
                    } else {
                        VersionStatus::OutOfDate { latest }
                    });
                }
                Err(e) => {
                    warn!("version check failed: {e}");
                    slot.in_use.store(false, Ordering::SeqCst);
                }
            }
        }
        None
    }
}
