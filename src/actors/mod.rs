//! Concurrent refresh and coordination engine
//!
//! Every moving part runs as an independent async task; the only shared
//! mutable state is each server's snapshot (single writer) and a handful
//! of latched flags.
//!
//! ## Architecture Overview
//!
//! ```text
//!  Poller-1 .. Poller-N        one loop per enabled server
//!     |            |           owns its StatusSnapshot
//!     +------+-----+
//!            v
//!   Broadcast Channel          PresentationEvent (MPMC)
//!            |
//!     +------+--------+-----------------+
//!     v               v                 v
//!  Presentation   NotificationLoop   (any other subscriber)
//!  sink (UI)      flash/sound cadence
//!
//!  RefreshCoordinator    ->  latches a refresh on every idle poller
//!  RecheckAllCoordinator ->  fans out one task per host/service,
//!                            barrier, settle, then refresh-all
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Events**: everything user-visible goes through one broadcast
//!    channel; the sink is never awaited.
//! 2. **Latched flags**: refresh requests and stop are level-triggered
//!    booleans on the poller handle, so repeated requests collapse
//!    instead of queueing.
//! 3. **Observed completion**: the recheck-all barrier watches task
//!    handles rather than waiting for tasks to report back.

pub mod messages;
pub mod notification;
pub mod poller;
pub mod recheck;
pub mod refresh;
