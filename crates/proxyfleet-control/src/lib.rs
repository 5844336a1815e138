//! proxyfleet-control — the publish use-cases.
//!
//! [`PublishCoordinator`] wires the store, config transformer, ingress,
//! and rollout tracker together per operation:
//!
//! - `create_version` — build and record a version-tagged artifact
//! - `publish` — validate, decide restart necessity, run the scoped
//!   dispatch/aggregation operation under the global deadline, commit
//! - `add_group` / `list_versions` — fleet registry upkeep
//!
//! A publish either fully commits (fleet state updated) or fully aborts
//! (fleet state untouched); partial progress only ever surfaces through
//! the returned [`PublishReport`] or the timeout error.

pub mod coordinator;
pub mod error;

pub use coordinator::{PublishCoordinator, PublishOptions, PublishReport};
pub use error::{PublishError, PublishResult};
