//! Shared status model: per-server snapshot of hosts and services.
//!
//! Every poller owns exactly one [`StatusSnapshot`] behind an `RwLock`.
//! The poller is the only writer; everyone else (presentation events,
//! coordinators, the notification loop) reads a clone or takes the read
//! side of the lock. Fetched data is merged with [`StatusSnapshot::apply`],
//! which is idempotent apart from the update timestamp.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::filters::Filters;

/// State of a single service, normalized across backend vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
    Down,
}

impl ServiceState {
    /// Anything that is not plain OK wants attention.
    pub fn is_alerting(&self) -> bool {
        !matches!(self, ServiceState::Ok)
    }

    /// Rank for picking the worst state out of a set.
    pub fn severity(&self) -> u8 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Unknown => 1,
            ServiceState::Warning => 2,
            ServiceState::Critical => 3,
            ServiceState::Down => 4,
        }
    }
}

/// Connection status of one server as seen by its poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Idle,
    Refreshing,
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub state: ServiceState,
    /// How long the service has been in this state, as reported.
    pub duration: String,
    pub status_information: String,
    /// Passive services cannot be actively rechecked.
    pub passive_only: bool,
    pub acknowledged: bool,
    pub in_downtime: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStatus {
    pub name: String,
    pub address: String,
    pub services: HashMap<String, ServiceStatus>,
    /// Cleared at the start of a global refresh pass, set again when a
    /// fetch mentions the host. A host that stays unfresh disappeared from
    /// the monitor; whether to drop it is the presentation layer's call.
    pub fresh: bool,
}

impl HostStatus {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            services: HashMap::new(),
            fresh: true,
        }
    }

    pub fn with_service(mut self, service: ServiceStatus) -> Self {
        self.services.insert(service.name.clone(), service);
        self
    }
}

/// One complete fetch result from a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedStatus {
    pub hosts: Vec<HostStatus>,
}

/// Aggregate counts per service state, for status lines and sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
    pub unknown: usize,
    pub down: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub last_update: Option<DateTime<Utc>>,
    pub connection_state: ConnectionState,
    pub error_message: String,
    pub hosts: HashMap<String, HostStatus>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSnapshot {
    pub fn new() -> Self {
        Self {
            last_update: None,
            connection_state: ConnectionState::Idle,
            error_message: String::new(),
            hosts: HashMap::new(),
        }
    }

    /// Merge a fetch result into the snapshot.
    ///
    /// Hosts present in the fetch are replaced wholesale and marked fresh;
    /// hosts the fetch no longer mentions are kept with whatever freshness
    /// they had. Applying the same data twice changes nothing but
    /// `last_update`. Entries the user filtered out never enter the
    /// snapshot.
    pub fn apply(&mut self, fetched: FetchedStatus, filters: &Filters) {
        for mut host in fetched.hosts {
            if filters.host_filtered_out(&host.name) {
                continue;
            }
            host.services.retain(|name, service| {
                !filters.service_filtered_out(name)
                    && !filters.status_information_filtered_out(&service.status_information)
            });
            host.fresh = true;
            self.hosts.insert(host.name.clone(), host);
        }
        self.connection_state = ConnectionState::Connected;
        self.error_message.clear();
        self.last_update = Some(Utc::now());
    }

    /// Drop all freshness markers. Done once at the start of a global
    /// refresh pass so the following fetches reveal disappeared entries.
    pub fn clear_freshness(&mut self) {
        for host in self.hosts.values_mut() {
            host.fresh = false;
        }
    }

    pub fn state_counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for host in self.hosts.values() {
            for service in host.services.values() {
                match service.state {
                    ServiceState::Ok => counts.ok += 1,
                    ServiceState::Warning => counts.warning += 1,
                    ServiceState::Critical => counts.critical += 1,
                    ServiceState::Unknown => counts.unknown += 1,
                    ServiceState::Down => counts.down += 1,
                }
            }
        }
        counts
    }

    /// All services that currently want attention: alerting state, not
    /// acknowledged, not in a downtime window. Returned as
    /// (host, service, state) triples.
    pub fn alerting_services(&self) -> Vec<(String, String, ServiceState)> {
        let mut alerting = Vec::new();
        for host in self.hosts.values() {
            for service in host.services.values() {
                if service.state.is_alerting() && !service.acknowledged && !service.in_downtime {
                    alerting.push((host.name.clone(), service.name.clone(), service.state));
                }
            }
        }
        alerting
    }

    /// The most severe state among services needing attention, if any.
    pub fn worst_state(&self) -> Option<ServiceState> {
        self.alerting_services()
            .into_iter()
            .map(|(_, _, state)| state)
            .max_by_key(ServiceState::severity)
    }
}
