//! One-shot done latch.

use tokio::sync::watch;

/// A latch that starts unsignaled and latches permanently once
/// signaled. Any number of tasks may wait; waiters that arrive after
/// the signal return immediately. Built on a watch channel, the same
/// primitive the daemons use for shutdown fan-out.
pub struct DoneLatch {
    state: watch::Sender<bool>,
}

impl DoneLatch {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state }
    }

    /// Latch. Further signals are no-ops.
    pub fn signal(&self) {
        self.state.send_replace(true);
    }

    pub fn is_signaled(&self) -> bool {
        *self.state.borrow()
    }

    /// Wait until signaled.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail while
        // we hold `&self`.
        let _ = rx.wait_for(|signaled| *signaled).await;
    }
}

impl Default for DoneLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_after_signal() {
        let latch = Arc::new(DoneLatch::new());
        assert!(!latch.is_signaled());

        let waiter = tokio::spawn({
            let latch = latch.clone();
            async move { latch.wait().await }
        });

        latch.signal();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
        assert!(latch.is_signaled());
    }

    #[tokio::test]
    async fn late_waiters_return_immediately() {
        let latch = DoneLatch::new();
        latch.signal();
        latch.signal(); // idempotent
        latch.wait().await;
    }

    #[tokio::test]
    async fn multiple_waiters_all_wake() {
        let latch = Arc::new(DoneLatch::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let latch = latch.clone();
                tokio::spawn(async move { latch.wait().await })
            })
            .collect();

        latch.signal();
        for w in waiters {
            tokio::time::timeout(Duration::from_secs(1), w)
                .await
                .expect("waiter should finish")
                .unwrap();
        }
    }
}
