//! RolloutTracker — per-group progress view and report aggregation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use proxyfleet_core::{CompletionReport, PublishInstruction, ReportResult, ServerGroup};
use proxyfleet_store::BlobStore;

use crate::latch::DoneLatch;
use crate::observer::{NullObserver, ProgressObserver};

/// Per-group rollout status. Transitions are monotonic:
/// `Pending → Running → Completed`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Pending,
    Running,
    Completed,
}

/// Fleet-wide publish phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FleetPhase {
    AwaitingStart,
    Dispatching,
    AwaitingCompletion,
    Done,
    /// The global deadline interrupted the rollout. Terminal; groups
    /// still `Running` stay `Running`.
    TimedOut,
}

/// Final per-group view handed back to the publish caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub status: GroupStatus,
    pub done_count: u32,
    pub server_count: u32,
}

struct GroupProgress {
    server_count: u32,
    status: Mutex<GroupStatus>,
    done_count: AtomicU32,
    done: DoneLatch,
}

impl GroupProgress {
    fn new(server_count: u32) -> Self {
        Self {
            server_count,
            status: Mutex::new(GroupStatus::Pending),
            done_count: AtomicU32::new(0),
            done: DoneLatch::new(),
        }
    }

    fn status(&self) -> GroupStatus {
        *self.status.lock().expect("status lock")
    }

    /// Pending → Running. No-op once past Pending (a straggling dispatch
    /// write must not regress a completed group).
    fn mark_running(&self) {
        let mut status = self.status.lock().expect("status lock");
        if *status == GroupStatus::Pending {
            *status = GroupStatus::Running;
        }
    }

    /// Record one successful agent report. Returns true when this report
    /// completed the group (fires the done latch exactly once).
    fn record_success(&self, group: &str) -> bool {
        let done = self.done_count.load(Ordering::Acquire);
        if done >= self.server_count {
            warn!(group, "excess success report ignored, group already complete");
            return false;
        }
        // The aggregator is the only writer of done_count.
        let done = done + 1;
        self.done_count.store(done, Ordering::Release);

        if done == self.server_count {
            *self.status.lock().expect("status lock") = GroupStatus::Completed;
            self.done.signal();
            true
        } else {
            false
        }
    }
}

/// Tracks one publish across the fleet.
///
/// Built once per publish from the registered groups. The aggregator
/// task is the only writer of per-group counters; dispatch only flips
/// `Pending → Running`. No writer overlap, so a per-group mutex on the
/// status field is all the locking needed.
pub struct RolloutTracker {
    groups: BTreeMap<String, GroupProgress>,
    total_servers: u32,
    phase: Mutex<FleetPhase>,
    fleet_done: DoneLatch,
    observer: Arc<dyn ProgressObserver>,
}

impl RolloutTracker {
    pub fn new(groups: &BTreeMap<String, ServerGroup>) -> Self {
        Self::with_observer(groups, Arc::new(NullObserver))
    }

    pub fn with_observer(
        groups: &BTreeMap<String, ServerGroup>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        let progress: BTreeMap<String, GroupProgress> = groups
            .iter()
            .map(|(name, group)| (name.clone(), GroupProgress::new(group.server_count)))
            .collect();
        let total_servers = groups.values().map(|g| g.server_count).sum();

        Self {
            groups: progress,
            total_servers,
            phase: Mutex::new(FleetPhase::AwaitingStart),
            fleet_done: DoneLatch::new(),
            observer,
        }
    }

    pub fn total_servers(&self) -> u32 {
        self.total_servers
    }

    pub fn group_count(&self) -> u32 {
        self.groups.len() as u32
    }

    pub fn phase(&self) -> FleetPhase {
        *self.phase.lock().expect("phase lock")
    }

    pub fn group_status(&self, group: &str) -> Option<GroupStatus> {
        self.groups.get(group).map(|g| g.status())
    }

    /// Final per-group view (status and counts), ordered by group name.
    pub fn outcomes(&self) -> BTreeMap<String, GroupOutcome> {
        self.groups
            .iter()
            .map(|(name, g)| {
                (
                    name.clone(),
                    GroupOutcome {
                        status: g.status(),
                        done_count: g.done_count.load(Ordering::Acquire),
                        server_count: g.server_count,
                    },
                )
            })
            .collect()
    }

    /// True when every group reached `Completed`.
    pub fn is_fleet_complete(&self) -> bool {
        self.groups.values().all(|g| g.status() == GroupStatus::Completed)
    }

    pub fn mark_dispatching(&self) {
        self.advance_phase(FleetPhase::Dispatching);
    }

    pub fn mark_awaiting_completion(&self) {
        self.advance_phase(FleetPhase::AwaitingCompletion);
    }

    /// Applied by the coordinator when the global deadline expires.
    pub fn mark_timed_out(&self) {
        let mut phase = self.phase.lock().expect("phase lock");
        if *phase != FleetPhase::Done {
            *phase = FleetPhase::TimedOut;
        }
    }

    fn advance_phase(&self, to: FleetPhase) {
        let mut phase = self.phase.lock().expect("phase lock");
        if matches!(*phase, FleetPhase::Done | FleetPhase::TimedOut) {
            return;
        }
        *phase = to;
    }

    /// Wait for one group's done latch (gradual dispatch gate).
    pub async fn wait_group_done(&self, group: &str) {
        if let Some(progress) = self.groups.get(group) {
            progress.done.wait().await;
        }
    }

    /// Wait for the fleet done latch.
    pub async fn wait_fleet_done(&self) {
        self.fleet_done.wait().await;
    }

    /// Consume completion reports until every targeted server has
    /// reported (success or failure both count toward termination; only
    /// successes advance a group). Runs as a background task for the
    /// duration of the publish.
    ///
    /// The fleet done latch fires when the running total reaches
    /// `total_servers` — even when some reports were failures, so a
    /// "done" fleet can still hold incomplete groups; callers see that
    /// through [`outcomes`](Self::outcomes).
    pub async fn aggregate(&self, mut reports: mpsc::Receiver<CompletionReport>) {
        let mut received = 0u32;
        let mut successes = 0u32;

        while received < self.total_servers {
            let Some(report) = reports.recv().await else {
                // All senders dropped: the publish scope is tearing down.
                debug!(received, "report channel closed before fleet total");
                break;
            };
            received += 1;

            match report.result {
                ReportResult::Success => {
                    let Some(group) = self.groups.get(&report.server_group) else {
                        warn!(group = %report.server_group, "report from unknown group");
                        continue;
                    };
                    successes += 1;
                    let completed = group.record_success(&report.server_group);
                    self.observer.on_report(
                        &report.server_group,
                        group.done_count.load(Ordering::Acquire),
                        successes,
                        self.total_servers,
                    );
                    if completed {
                        info!(group = %report.server_group, "group completed version publishing");
                        self.observer.on_group_completed(&report.server_group);
                    }
                }
                ReportResult::Failure => {
                    warn!(group = %report.server_group, "agent reported publish failure");
                }
            }
        }

        self.advance_phase(FleetPhase::Done);
        self.fleet_done.signal();
        info!(received, successes, total = self.total_servers, "report aggregation finished");
    }

    /// Write the publish instruction to the group's designated blob key
    /// and mark the group `Running`. Failures are logged and contained:
    /// a group whose dispatch failed simply never reports, and the
    /// aggregator stalls on it until the global deadline.
    pub async fn dispatch_group(
        &self,
        store: Arc<dyn BlobStore>,
        key: &str,
        group: &str,
        instruction: &PublishInstruction,
    ) {
        let payload = match serde_json::to_string(instruction) {
            Ok(payload) => payload,
            Err(e) => {
                error!(group, error = %e, "failed to encode publish instruction");
                return;
            }
        };

        if let Err(e) = store.put(key, &payload).await {
            error!(group, error = %e, "group dispatch failed, group will not complete");
            return;
        }

        if let Some(progress) = self.groups.get(group) {
            progress.mark_running();
        }
        debug!(group, key, "publish instruction dispatched");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    use async_trait::async_trait;
    use proxyfleet_store::{MemBlobStore, StoreError, StoreResult};

    fn groups(sizes: &[(&str, u32)]) -> BTreeMap<String, ServerGroup> {
        sizes.iter()
            .map(|(name, count)| {
                (
                    name.to_string(),
                    ServerGroup {
                        server_count: *count,
                    },
                )
            })
            .collect()
    }

    fn success(group: &str) -> CompletionReport {
        CompletionReport {
            server_group: group.to_string(),
            result: ReportResult::Success,
        }
    }

    fn failure(group: &str) -> CompletionReport {
        CompletionReport {
            server_group: group.to_string(),
            result: ReportResult::Failure,
        }
    }

    fn instruction() -> PublishInstruction {
        PublishInstruction {
            version: "v1".to_string(),
            exposed_ports: BTreeSet::from([8080]),
            timestamp: 1_700_000_000,
            restart_required: false,
        }
    }

    #[test]
    fn initialize_computes_totals() {
        let tracker = RolloutTracker::new(&groups(&[("a", 3), ("b", 5)]));
        assert_eq!(tracker.total_servers(), 8);
        assert_eq!(tracker.group_count(), 2);
        assert_eq!(tracker.phase(), FleetPhase::AwaitingStart);
        assert_eq!(tracker.group_status("a"), Some(GroupStatus::Pending));
    }

    #[tokio::test]
    async fn exact_success_count_completes_group_and_fleet() {
        let tracker = Arc::new(RolloutTracker::new(&groups(&[("a", 3)])));
        let (tx, rx) = mpsc::channel(16);

        let agg = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.aggregate(rx).await }
        });

        for _ in 0..3 {
            tx.send(success("a")).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(1), tracker.wait_fleet_done())
            .await
            .expect("fleet done should fire");
        agg.await.unwrap();

        assert_eq!(tracker.group_status("a"), Some(GroupStatus::Completed));
        assert_eq!(tracker.phase(), FleetPhase::Done);
        assert!(tracker.is_fleet_complete());

        let outcomes = tracker.outcomes();
        assert_eq!(outcomes["a"].done_count, 3);
        assert_eq!(outcomes["a"].server_count, 3);
    }

    #[tokio::test]
    async fn failures_count_toward_termination_but_not_completion() {
        let tracker = Arc::new(RolloutTracker::new(&groups(&[("a", 3)])));
        let (tx, rx) = mpsc::channel(16);

        let agg = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.aggregate(rx).await }
        });

        tx.send(success("a")).await.unwrap();
        tx.send(failure("a")).await.unwrap();
        tx.send(success("a")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), tracker.wait_fleet_done())
            .await
            .expect("fleet done fires on total reports regardless of outcome");
        agg.await.unwrap();

        // 2 successes out of 3 servers: fleet is "done" but the group
        // never completed. The ambiguity is surfaced, not hidden.
        assert_eq!(tracker.group_status("a"), Some(GroupStatus::Pending));
        assert!(!tracker.is_fleet_complete());
        assert_eq!(tracker.outcomes()["a"].done_count, 2);
    }

    #[tokio::test]
    async fn per_group_latches_fire_independently() {
        let tracker = Arc::new(RolloutTracker::new(&groups(&[("a", 1), ("b", 2)])));
        let (tx, rx) = mpsc::channel(16);

        let agg = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.aggregate(rx).await }
        });

        tx.send(success("a")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_group_done("a"))
            .await
            .expect("group a latch should fire");
        assert_eq!(tracker.group_status("a"), Some(GroupStatus::Completed));
        assert_eq!(tracker.group_status("b"), Some(GroupStatus::Pending));

        tx.send(success("b")).await.unwrap();
        tx.send(success("b")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_fleet_done())
            .await
            .expect("fleet latch should fire");
        agg.await.unwrap();
        assert!(tracker.is_fleet_complete());
    }

    #[tokio::test]
    async fn unknown_group_reports_still_count_toward_total() {
        let tracker = Arc::new(RolloutTracker::new(&groups(&[("a", 1)])));
        let (tx, rx) = mpsc::channel(16);

        let agg = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.aggregate(rx).await }
        });

        tx.send(success("ghost")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_fleet_done())
            .await
            .expect("fleet done fires after one report");
        agg.await.unwrap();

        assert_eq!(tracker.group_status("a"), Some(GroupStatus::Pending));
    }

    #[tokio::test]
    async fn channel_close_ends_aggregation() {
        let tracker = Arc::new(RolloutTracker::new(&groups(&[("a", 2)])));
        let (tx, rx) = mpsc::channel(16);

        tx.send(success("a")).await.unwrap();
        drop(tx);

        tracker.aggregate(rx).await;
        assert!(tracker.fleet_done.is_signaled());
        assert_eq!(tracker.outcomes()["a"].done_count, 1);
    }

    #[tokio::test]
    async fn dispatch_writes_instruction_and_marks_running() {
        let tracker = RolloutTracker::new(&groups(&[("a", 2)]));
        let store = Arc::new(MemBlobStore::new());

        tracker
            .dispatch_group(
                store.clone(),
                "running_versions/nginx-group-a.json",
                "a",
                &instruction(),
            )
            .await;

        assert_eq!(tracker.group_status("a"), Some(GroupStatus::Running));
        let stored = store
            .get("running_versions/nginx-group-a.json")
            .await
            .unwrap()
            .unwrap();
        let decoded: PublishInstruction = serde_json::from_str(&stored).unwrap();
        assert_eq!(decoded, instruction());
    }

    struct FailingStore;

    #[async_trait]
    impl proxyfleet_store::BlobStore for FailingStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Ok(None)
        }
        async fn put(&self, key: &str, _content: &str) -> StoreResult<()> {
            Err(StoreError::Write(key.to_string(), "injected".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_dispatch_leaves_group_pending() {
        let tracker = RolloutTracker::new(&groups(&[("a", 2)]));

        tracker
            .dispatch_group(Arc::new(FailingStore), "key", "a", &instruction())
            .await;

        // Contained: logged, group simply never progresses.
        assert_eq!(tracker.group_status("a"), Some(GroupStatus::Pending));
    }

    #[test]
    fn timed_out_does_not_override_done() {
        let tracker = RolloutTracker::new(&groups(&[("a", 1)]));
        tracker.mark_dispatching();
        assert_eq!(tracker.phase(), FleetPhase::Dispatching);
        tracker.mark_timed_out();
        assert_eq!(tracker.phase(), FleetPhase::TimedOut);
        // Terminal: later transitions are ignored.
        tracker.mark_awaiting_completion();
        assert_eq!(tracker.phase(), FleetPhase::TimedOut);

        let tracker = RolloutTracker::new(&groups(&[("a", 1)]));
        tracker.advance_phase(FleetPhase::Done);
        tracker.mark_timed_out();
        assert_eq!(tracker.phase(), FleetPhase::Done);
    }

    #[tokio::test]
    async fn excess_success_reports_do_not_overflow() {
        let tracker = RolloutTracker::new(&groups(&[("a", 1)]));
        assert!(tracker.groups["a"].record_success("a"));
        assert!(!tracker.groups["a"].record_success("a"));
        assert_eq!(tracker.outcomes()["a"].done_count, 1);
    }
}
