//! proxyfleet-ingress — the agent notification service.
//!
//! A passive HTTP endpoint fleet agents call once per completed publish
//! action. `POST /notify` carries `{"message": "<json report>"}`; the
//! decoded [`CompletionReport`] is forwarded onto a bounded channel whose
//! consumer is the rollout aggregator. A full channel blocks the remote
//! caller — backpressure is intentional, agents retry or wait.

pub mod server;

pub use server::{IngressError, NotifyIngress, NotifyRequest, NotifyResponse};
