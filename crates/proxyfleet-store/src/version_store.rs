//! VersionStore — owns the persisted fleet state.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use proxyfleet_core::{FleetConfig, FleetState, ServerGroup, Version};

use crate::blob::BlobStore;
use crate::error::{StoreError, StoreResult};

/// Exclusive owner of [`FleetState`].
///
/// Every mutating call persists the full state blob before returning, so
/// a publish that aborts mid-flight leaves the stored state untouched —
/// callers only reach [`commit_publish`](Self::commit_publish) once the
/// rollout has fully completed.
pub struct VersionStore {
    store: Arc<dyn BlobStore>,
    config: FleetConfig,
    state: FleetState,
}

impl VersionStore {
    /// Load fleet state from the store. An absent state blob initializes
    /// an empty fleet; only underlying I/O faults are errors.
    pub async fn load(store: Arc<dyn BlobStore>, config: FleetConfig) -> StoreResult<Self> {
        let state = match store.get(&config.state_key).await? {
            Some(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Deserialize(config.state_key.clone(), e.to_string()))?,
            None => {
                debug!(key = %config.state_key, "no fleet state blob, starting empty");
                FleetState::default()
            }
        };
        Ok(Self { store, config, state })
    }

    pub fn state(&self) -> &FleetState {
        &self.state
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Shared handle to the underlying blob store (used for per-group
    /// instruction writes during dispatch).
    pub fn blob_store(&self) -> Arc<dyn BlobStore> {
        Arc::clone(&self.store)
    }

    /// Register (or resize) a server group and persist immediately.
    pub async fn register_group(&mut self, name: &str, server_count: u32) -> StoreResult<()> {
        self.state
            .server_groups
            .insert(name.to_string(), ServerGroup { server_count });
        self.persist().await?;
        info!(group = name, servers = server_count, "server group registered");
        Ok(())
    }

    /// Write the artifact blob for `version` and record the version as
    /// available. Re-recording an existing version (an overwrite) rewrites
    /// the blob but leaves `available_versions` unchanged.
    pub async fn record_new_version(&mut self, version: &str, artifact_text: &str) -> StoreResult<()> {
        let key = self.config.version_key(version);
        self.store.put(&key, artifact_text).await?;

        let is_overwrite = self.state.available_versions.contains(version);
        if !is_overwrite {
            self.state.available_versions.insert(version.to_string());
            self.persist().await?;
        }
        info!(version, key, is_overwrite, "config version recorded");
        Ok(())
    }

    /// Read back the artifact text for `version`, if any was recorded.
    pub async fn load_artifact(&self, version: &str) -> StoreResult<Option<String>> {
        self.store.get(&self.config.version_key(version)).await
    }

    /// Mark `version` as the running version with its exposed ports and
    /// persist. Called only after a rollout fully completed.
    pub async fn commit_publish(
        &mut self,
        version: &Version,
        exposed_ports: BTreeSet<u16>,
    ) -> StoreResult<()> {
        self.state.current_version = Some(version.clone());
        self.state.exposed_ports = exposed_ports;
        self.persist().await?;
        info!(version = %version, "publish committed");
        Ok(())
    }

    async fn persist(&self) -> StoreResult<()> {
        let content = serde_json::to_string(&self.state)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.store.put(&self.config.state_key, &content).await
    }
}
