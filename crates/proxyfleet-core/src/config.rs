//! Fleet configuration — tunable constants and blob-store key layout.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configured constants for the control plane.
///
/// Loadable from a toml file; any omitted field falls back to its default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Blob key of the fleet-state JSON document.
    pub state_key: String,
    /// Key prefix under which versioned config artifacts are stored.
    pub versions_prefix: String,
    /// Key prefix under which per-group publish instructions are stored.
    pub running_prefix: String,
    /// Reserved port the injected version-marker server listens on.
    /// Excluded from exposed-port extraction and diffing.
    pub control_port: u16,
    /// Port the notification ingress binds. `0` picks an ephemeral port.
    pub ingress_port: u16,
    /// Hard wall-clock deadline for a whole publish operation.
    pub publish_timeout_secs: u64,
    /// Capacity of the report channel between ingress and aggregator.
    /// A full channel blocks remote callers (intentional backpressure).
    pub channel_capacity: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            state_key: "state.json".to_string(),
            versions_prefix: "config_versions".to_string(),
            running_prefix: "running_versions".to_string(),
            control_port: 8099,
            ingress_port: 50061,
            publish_timeout_secs: 300,
            channel_capacity: 1000,
        }
    }
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FleetConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Blob key of the artifact for `version`.
    pub fn version_key(&self, version: &str) -> String {
        format!("{}/nginx-{version}.conf", self.versions_prefix)
    }

    /// Blob key of the running-version instruction for `group`.
    pub fn group_instruction_key(&self, group: &str) -> String {
        format!("{}/nginx-group-{group}.json", self.running_prefix)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = FleetConfig::default();
        assert_eq!(config.control_port, 8099);
        assert_eq!(config.channel_capacity, 1000);
        assert_eq!(config.publish_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn key_layout() {
        let config = FleetConfig::default();
        assert_eq!(config.version_key("v1"), "config_versions/nginx-v1.conf");
        assert_eq!(
            config.group_instruction_key("edge"),
            "running_versions/nginx-group-edge.json"
        );
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "control_port = 9001\npublish_timeout_secs = 30").unwrap();

        let config = FleetConfig::from_file(file.path()).unwrap();
        assert_eq!(config.control_port, 9001);
        assert_eq!(config.publish_timeout_secs, 30);
        // Untouched fields keep their defaults.
        assert_eq!(config.state_key, "state.json");
        assert_eq!(config.ingress_port, 50061);
    }
}
