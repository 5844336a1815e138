//! proxyfleet-store — blob storage and fleet-state persistence.
//!
//! The control plane talks to one logical bucket of string blobs through
//! the [`BlobStore`] trait. Two backends ship here: a filesystem store for
//! production single-node use and an in-memory store for tests.
//!
//! [`VersionStore`] sits on top and owns the persisted
//! [`FleetState`](proxyfleet_core::FleetState): it loads the state blob on
//! startup (absent blob means empty fleet, not an error) and rewrites the
//! whole blob after every mutation. Persistence is last-writer-wins — no
//! optimistic concurrency — under the single-operator assumption.

pub mod blob;
pub mod error;
pub mod version_store;

pub use blob::{BlobStore, FsBlobStore, MemBlobStore};
pub use error::{StoreError, StoreResult};
pub use version_store::VersionStore;
