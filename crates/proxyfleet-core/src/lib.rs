//! proxyfleet-core — shared domain types for the proxyfleet control plane.
//!
//! Defines the fleet state and the wire formats exchanged with agents
//! (publish instructions, completion reports), the configured constants
//! (`FleetConfig`), and the injected capabilities (`Clock`, `Confirm`)
//! that keep the orchestration crates free of ambient globals.
//!
//! # Wire formats
//!
//! All blob and network payloads are JSON. Field names are part of the
//! contract with the fleet-side agents: server group sizes serialize as
//! `nginx_servers_count`, report outcomes as `containers_publish_result`,
//! and ports travel as strings (`"8080"`).

pub mod caps;
pub mod config;
pub mod types;

pub use caps::{AlwaysConfirm, Clock, Confirm, NeverConfirm, SystemClock};
pub use config::FleetConfig;
pub use types::*;
