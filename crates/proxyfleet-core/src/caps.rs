//! Injected capabilities — wall clock and operator confirmation.
//!
//! The coordinator never reads the terminal or the system clock directly;
//! callers supply these so tests can run deterministically.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for instruction timestamps.
pub trait Clock: Send + Sync {
    fn epoch_secs(&self) -> u64;
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Operator yes/no confirmation (overwrite an existing version, proceed
/// with a restart-requiring publish).
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers yes to every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Answers no to every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}
