//! proxyfleet-rollout — the rollout orchestration engine.
//!
//! Drives one publish across a fleet of server groups: per-group
//! progress tracking, aggregation of completion reports arriving from
//! agents, one-shot done signals at group and fleet level, and group
//! dispatch (instruction blob writes).
//!
//! # State machines
//!
//! Per group: `Pending → Running → Completed`, monotonic. Fleet:
//! `AwaitingStart → Dispatching → AwaitingCompletion → Done`, with an
//! orthogonal `TimedOut` terminal outcome the coordinator applies when
//! the global deadline interrupts the rollout.
//!
//! # Components
//!
//! - **`latch`** — one-shot done signals over a watch channel
//! - **`tracker`** — `RolloutTracker`: progress view, aggregator, dispatch
//! - **`observer`** — injected progress display seam

pub mod latch;
pub mod observer;
pub mod tracker;

pub use latch::DoneLatch;
pub use observer::{NullObserver, ProgressObserver};
pub use tracker::{FleetPhase, GroupOutcome, GroupStatus, RolloutTracker};
