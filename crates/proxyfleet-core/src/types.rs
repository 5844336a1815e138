//! Domain types and their JSON wire bindings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Identifier for one configuration version. Opaque to the control plane.
pub type Version = String;

/// A named group of nginx servers that rolls out as one unit.
///
/// The group name lives as the map key in [`FleetState::server_groups`];
/// on the wire only the size is carried, under `nginx_servers_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerGroup {
    #[serde(rename = "nginx_servers_count")]
    pub server_count: u32,
}

/// Fleet-wide persisted state, stored as one JSON blob.
///
/// Ordered collections (`BTreeSet`/`BTreeMap`) keep the persisted bytes
/// deterministic for a given logical state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetState {
    pub current_version: Option<Version>,
    pub available_versions: BTreeSet<Version>,
    #[serde(with = "port_strings")]
    pub exposed_ports: BTreeSet<u16>,
    pub server_groups: BTreeMap<String, ServerGroup>,
}

impl FleetState {
    /// Total number of nginx servers across all registered groups.
    pub fn total_servers(&self) -> u32 {
        self.server_groups.values().map(|g| g.server_count).sum()
    }
}

/// Per-group publish payload, written to the blob store for the group's
/// agents to fetch and act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishInstruction {
    pub version: Version,
    #[serde(with = "port_strings")]
    pub exposed_ports: BTreeSet<u16>,
    /// Epoch seconds at dispatch time.
    pub timestamp: u64,
    /// Set when the new version changes the externally reachable listen
    /// ports, so agents must restart rather than reload.
    #[serde(default, skip_serializing_if = "is_false")]
    pub restart_required: bool,
}

/// Inbound message from an agent after it applied (or failed to apply)
/// a publish instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub server_group: String,
    #[serde(rename = "containers_publish_result")]
    pub result: ReportResult,
}

/// Outcome of a single agent's publish action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportResult {
    Success,
    Failure,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Ports serialize as decimal strings on the wire (`["80", "8080"]`),
/// matching what fleet agents expect.
mod port_strings {
    use std::collections::BTreeSet;

    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ports: &BTreeSet<u16>, ser: S) -> Result<S::Ok, S::Error> {
        let mut seq = ser.serialize_seq(Some(ports.len()))?;
        for port in ports {
            seq.serialize_element(&port.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<BTreeSet<u16>, D::Error> {
        let raw = Vec::<String>::deserialize(de)?;
        raw.iter()
            .map(|s| s.parse::<u16>().map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_state_wire_field_names() {
        let mut state = FleetState::default();
        state.current_version = Some("v2".to_string());
        state.available_versions.insert("v1".to_string());
        state.available_versions.insert("v2".to_string());
        state.exposed_ports.insert(80);
        state.exposed_ports.insert(8080);
        state
            .server_groups
            .insert("edge".to_string(), ServerGroup { server_count: 3 });

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["current_version"], "v2");
        assert_eq!(json["available_versions"], serde_json::json!(["v1", "v2"]));
        assert_eq!(json["exposed_ports"], serde_json::json!(["80", "8080"]));
        assert_eq!(json["server_groups"]["edge"]["nginx_servers_count"], 3);
    }

    #[test]
    fn fleet_state_roundtrip_is_deterministic() {
        let mut state = FleetState::default();
        state.exposed_ports.extend([443, 80, 8080]);
        state
            .server_groups
            .insert("b".to_string(), ServerGroup { server_count: 2 });
        state
            .server_groups
            .insert("a".to_string(), ServerGroup { server_count: 1 });

        let first = serde_json::to_string(&state).unwrap();
        let back: FleetState = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&back).unwrap();
        assert_eq!(first, second);
        assert_eq!(back, state);
    }

    #[test]
    fn total_servers_sums_groups() {
        let mut state = FleetState::default();
        assert_eq!(state.total_servers(), 0);

        state
            .server_groups
            .insert("a".to_string(), ServerGroup { server_count: 3 });
        state
            .server_groups
            .insert("b".to_string(), ServerGroup { server_count: 5 });
        assert_eq!(state.total_servers(), 8);
    }

    #[test]
    fn instruction_omits_restart_flag_when_false() {
        let instruction = PublishInstruction {
            version: "v1".to_string(),
            exposed_ports: BTreeSet::from([8080]),
            timestamp: 1_700_000_000,
            restart_required: false,
        };
        let json = serde_json::to_value(&instruction).unwrap();
        assert!(json.get("restart_required").is_none());
        assert_eq!(json["exposed_ports"], serde_json::json!(["8080"]));

        let with_restart = PublishInstruction {
            restart_required: true,
            ..instruction
        };
        let json = serde_json::to_value(&with_restart).unwrap();
        assert_eq!(json["restart_required"], true);
    }

    #[test]
    fn completion_report_wire_format() {
        let report: CompletionReport = serde_json::from_str(
            r#"{"server_group": "edge", "containers_publish_result": "Success"}"#,
        )
        .unwrap();
        assert_eq!(report.server_group, "edge");
        assert_eq!(report.result, ReportResult::Success);

        let failure = CompletionReport {
            server_group: "edge".to_string(),
            result: ReportResult::Failure,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["containers_publish_result"], "Failure");
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let result: Result<FleetState, _> = serde_json::from_str(
            r#"{"current_version": null, "available_versions": [], "exposed_ports": ["eighty"], "server_groups": {}}"#,
        );
        assert!(result.is_err());
    }
}
