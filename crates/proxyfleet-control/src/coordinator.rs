//! PublishCoordinator — top-level use-cases.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use proxyfleet_conf::{create_version_artifact, extract_exposed_ports, ConfTree};
use proxyfleet_core::{
    Clock, Confirm, FleetState, NeverConfirm, PublishInstruction, SystemClock, Version,
};
use proxyfleet_ingress::NotifyIngress;
use proxyfleet_rollout::{GroupOutcome, NullObserver, ProgressObserver, RolloutTracker};
use proxyfleet_store::VersionStore;

use crate::error::{PublishError, PublishResult};

/// Caller-selectable publish behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    /// Dispatch group-by-group, gating each group on the previous
    /// group's completion, instead of all groups concurrently.
    pub gradual: bool,
    /// Allow re-publishing the already-current version.
    pub force: bool,
}

/// What a finished publish looked like, group by group.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub version: Version,
    pub outcomes: BTreeMap<String, GroupOutcome>,
}

impl PublishReport {
    /// True when every group reached full completion. A fleet can
    /// finish its report quota with failures mixed in; this is how
    /// callers tell a clean publish from a degraded one.
    pub fn fully_completed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, o)| o.done_count == o.server_count)
    }
}

/// Wires store, transformer, ingress, and rollout tracker together per
/// publish request. Constructed with injected dependencies so tests run
/// without a real terminal, clock, or network port.
pub struct PublishCoordinator {
    versions: VersionStore,
    clock: Arc<dyn Clock>,
    confirm: Arc<dyn Confirm>,
    observer: Arc<dyn ProgressObserver>,
}

impl PublishCoordinator {
    pub fn new(versions: VersionStore) -> Self {
        Self {
            versions,
            clock: Arc::new(SystemClock),
            confirm: Arc::new(NeverConfirm),
            observer: Arc::new(NullObserver),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &FleetState {
        self.versions.state()
    }

    /// Versions available for publishing, in sorted order.
    pub fn list_versions(&self) -> Vec<String> {
        self.versions
            .state()
            .available_versions
            .iter()
            .cloned()
            .collect()
    }

    /// Register (or resize) a server group.
    pub async fn add_group(&mut self, name: &str, server_count: u32) -> PublishResult<()> {
        if name.is_empty() {
            return Err(PublishError::abort("Group name must not be empty."));
        }
        if server_count == 0 {
            return Err(PublishError::abort(
                "A server group needs at least one server.",
            ));
        }
        self.versions.register_group(name, server_count).await?;
        Ok(())
    }

    /// Build a version-tagged artifact from raw configuration text and
    /// record it. Creating a version that already exists requires the
    /// injected confirmation (overwrite rewrites the artifact blob but
    /// does not duplicate the version).
    ///
    /// Returns the artifact so a caller can chain straight into
    /// [`publish`](Self::publish) without re-reading storage.
    pub async fn create_version(
        &mut self,
        source_text: &str,
        version: &str,
    ) -> PublishResult<ConfTree> {
        if self.versions.state().available_versions.contains(version)
            && !self.confirm.confirm(&format!(
                "Version '{version}' already exists, do you want to overwrite it?"
            ))
        {
            return Err(PublishError::abort("User aborted operation."));
        }

        let base = ConfTree::parse(source_text)?;
        let control_port = self.versions.config().control_port;
        let artifact = create_version_artifact(base, version, control_port);

        self.versions
            .record_new_version(version, &artifact.render())
            .await?;

        info!(version, "config version created");
        Ok(artifact)
    }

    /// Publish `version` to every registered server group.
    ///
    /// Validation fails fast before any side effect. On success the new
    /// fleet state is committed; on abort or timeout persisted state is
    /// untouched and the error propagates.
    pub async fn publish(
        &mut self,
        version: &str,
        artifact: Option<ConfTree>,
        opts: PublishOptions,
    ) -> PublishResult<PublishReport> {
        let state = self.versions.state();

        if !state.available_versions.contains(version) {
            return Err(PublishError::abort(format!(
                "Version '{version}' is not available for publishing!"
            )));
        }
        if state.server_groups.is_empty() {
            return Err(PublishError::abort(
                "There are no nginx server groups configured!",
            ));
        }
        if state.current_version.as_deref() == Some(version) && !opts.force {
            return Err(PublishError::abort(format!(
                "Running version is already '{version}'!"
            )));
        }

        let artifact = match artifact {
            Some(artifact) => artifact,
            None => {
                let text = self.versions.load_artifact(version).await?.ok_or_else(|| {
                    PublishError::abort(format!(
                        "No nginx configuration file for version '{version}' has been found!"
                    ))
                })?;
                ConfTree::parse(&text)?
            }
        };

        let control_port = self.versions.config().control_port;
        let exposed_ports = extract_exposed_ports(&artifact, control_port);

        let state = self.versions.state();
        let mut restart_required = false;
        if exposed_ports != state.exposed_ports && state.current_version.is_some() {
            if !self.confirm.confirm(
                "Publishing this version will require a restart, would you like to continue?",
            ) {
                return Err(PublishError::abort("User aborted operation."));
            }
            restart_required = true;
        }

        let instruction = PublishInstruction {
            version: version.to_string(),
            exposed_ports: exposed_ports.clone(),
            timestamp: self.clock.epoch_secs(),
            restart_required,
        };

        let outcomes = self.run_rollout(&instruction, opts.gradual).await?;

        self.versions
            .commit_publish(&version.to_string(), exposed_ports)
            .await?;

        let report = PublishReport {
            version: version.to_string(),
            outcomes,
        };
        if report.fully_completed() {
            info!(version, "published version successfully");
        } else {
            warn!(version, "publish finished with incomplete groups");
        }
        Ok(report)
    }

    /// The scoped concurrent operation: ingress, aggregator, and
    /// per-group dispatch run as sibling tasks for the duration of one
    /// publish; the whole dispatch-then-await sequence races the global
    /// deadline. Teardown on every path stops the ingress first, then
    /// releases the report channel.
    async fn run_rollout(
        &self,
        instruction: &PublishInstruction,
        gradual: bool,
    ) -> PublishResult<BTreeMap<String, GroupOutcome>> {
        let config = self.versions.config();
        let groups = &self.versions.state().server_groups;

        let tracker = Arc::new(RolloutTracker::with_observer(groups, self.observer.clone()));
        info!(
            version = %instruction.version,
            servers = tracker.total_servers(),
            groups = tracker.group_count(),
            gradual,
            "publishing version to fleet"
        );
        self.observer.on_publish_started(
            &instruction.version,
            tracker.group_count(),
            tracker.total_servers(),
        );

        let (report_tx, report_rx) = mpsc::channel(config.channel_capacity);
        let mut ingress = NotifyIngress::new(config.ingress_port, report_tx);
        let ingress_addr = ingress.start().await?;
        self.observer.on_ingress_ready(ingress_addr);

        let aggregator = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.aggregate(report_rx).await }
        });

        let store = self.versions.blob_store();
        let rollout = async {
            tracker.mark_dispatching();
            for group in groups.keys() {
                // Offload the blob write so a slow store never blocks
                // the aggregator from draining the channel.
                tokio::spawn({
                    let tracker = tracker.clone();
                    let store = store.clone();
                    let key = config.group_instruction_key(group);
                    let group = group.clone();
                    let instruction = instruction.clone();
                    async move {
                        tracker
                            .dispatch_group(store, &key, &group, &instruction)
                            .await;
                    }
                });

                if gradual {
                    tracker.wait_group_done(group).await;
                }
            }
            tracker.mark_awaiting_completion();
            tracker.wait_fleet_done().await;
        };

        let timed_out = tokio::time::timeout(config.publish_timeout(), rollout)
            .await
            .is_err();

        ingress.stop().await;
        aggregator.abort();
        let _ = aggregator.await;

        if timed_out {
            tracker.mark_timed_out();
            warn!(version = %instruction.version, "publish timeout has been reached");
            return Err(PublishError::Timeout);
        }

        Ok(tracker.outcomes())
    }
}
