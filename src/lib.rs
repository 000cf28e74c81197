//! statuswatch - concurrent multi-server status refresh and coordination
//!
//! One autonomous poll loop per configured monitoring server, a global
//! recheck-all fan-out with a completion barrier, a notification loop
//! with its own cadence, and a broadcast event stream toward whatever
//! presentation surface is attached. Vendor protocols stay behind the
//! [`backend::MonitorBackend`] trait and its type-tag registry.

pub mod actors;
pub mod backend;
pub mod config;
pub mod duration;
pub mod filters;
pub mod status;
pub mod version;
