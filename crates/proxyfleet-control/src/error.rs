//! Error taxonomy for the publish use-cases.

use thiserror::Error;

use proxyfleet_conf::ConfError;
use proxyfleet_ingress::IngressError;
use proxyfleet_store::StoreError;

/// Result type alias for coordinator operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors surfaced by the publish use-cases.
///
/// `Abort` covers expected, user-facing precondition failures and never
/// corrupts persisted state. `Timeout` is distinct because it can carry
/// partial progress (some groups completed, some not) — persisted state
/// is still left unchanged. Everything else is an unexpected fault.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Expected precondition failure; recovered at the CLI boundary.
    #[error("{0}")]
    Abort(String),

    /// The global publish deadline elapsed before fleet completion.
    #[error("publish timeout has been reached")]
    Timeout,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration parse failed: {0}")]
    Conf(#[from] ConfError),

    #[error(transparent)]
    Ingress(#[from] IngressError),
}

impl PublishError {
    pub fn abort(message: impl Into<String>) -> Self {
        PublishError::Abort(message.into())
    }
}
