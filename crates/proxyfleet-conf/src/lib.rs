//! proxyfleet-conf — nginx configuration trees.
//!
//! Parses nginx-grammar configuration text into an explicit tagged tree
//! ([`Node::Directive`] vs [`Node::Block`]), renders it back, and applies
//! the two control-plane transforms:
//!
//! - [`create_version_artifact`] — inject the version-marker server block
//!   that answers with the active version string on the reserved control
//!   port.
//! - [`extract_exposed_ports`] — collect the externally reachable listen
//!   ports that drive the restart-required decision.

pub mod error;
pub mod parse;
pub mod transform;
pub mod tree;

pub use error::{ConfError, ConfResult};
pub use transform::{create_version_artifact, extract_exposed_ports};
pub use tree::{ConfTree, Node};
