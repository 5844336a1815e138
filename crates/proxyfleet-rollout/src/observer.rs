//! Progress observer seam.
//!
//! The tracker reports rollout progress through this trait instead of
//! printing, so the CLI can drive a console display and tests can stay
//! silent.

use std::net::SocketAddr;

/// Receives rollout progress callbacks. All methods default to no-ops.
pub trait ProgressObserver: Send + Sync {
    /// A publish started dispatching to `total_servers` across `groups`.
    fn on_publish_started(&self, _version: &str, _groups: u32, _total_servers: u32) {}

    /// The notification ingress is bound and accepting agent reports.
    fn on_ingress_ready(&self, _addr: SocketAddr) {}

    /// One successful report was aggregated. `fleet_done` is the running
    /// count of successes across all groups.
    fn on_report(&self, _group: &str, _group_done: u32, _fleet_done: u32, _total_servers: u32) {}

    /// A group reached full completion.
    fn on_group_completed(&self, _group: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {}
