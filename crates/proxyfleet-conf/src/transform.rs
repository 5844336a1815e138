//! Control-plane transforms over configuration trees.

use std::collections::BTreeSet;

use crate::tree::{ConfTree, Node};

/// Inject the version-marker server block into `base` and return the
/// resulting artifact.
///
/// The marker is a `server` block listening on `control_port` whose only
/// route returns the version string, so anyone can confirm which version
/// a proxy is actually serving by querying that port. It is appended as
/// the last child of the first top-level `http` block; a configuration
/// with no `http` block gains a synthesized one wrapping the marker.
pub fn create_version_artifact(mut base: ConfTree, version: &str, control_port: u16) -> ConfTree {
    let marker = version_marker(version, control_port);

    let http = base
        .nodes
        .iter_mut()
        .find(|node| matches!(node, Node::Block { name, .. } if name == "http"));

    match http {
        Some(Node::Block { children, .. }) => children.push(marker),
        _ => base.nodes.push(Node::block("http", &[], vec![marker])),
    }

    base
}

fn version_marker(version: &str, control_port: u16) -> Node {
    Node::block(
        "server",
        &[],
        vec![
            Node::directive("listen", &[&control_port.to_string()]),
            Node::block(
                "location",
                &["/"],
                vec![Node::directive(
                    "return",
                    &["200", &format!("\"{version}\"")],
                )],
            ),
        ],
    )
}

/// Collect the externally reachable listen ports of an artifact.
///
/// Walks every block recursively; a `listen` directive whose first
/// argument has the `host:port` form contributes its port unless it is
/// `control_port`. Bare-port forms (`listen 8080;`) are not extracted —
/// a known limitation carried over from the fleet agents' contract. An
/// empty result defaults to `{80}`, nginx's implicit listen port.
pub fn extract_exposed_ports(artifact: &ConfTree, control_port: u16) -> BTreeSet<u16> {
    let mut ports = BTreeSet::new();
    walk(&artifact.nodes, control_port, &mut ports);

    if ports.is_empty() {
        ports.insert(80);
    }
    ports
}

fn walk(nodes: &[Node], control_port: u16, ports: &mut BTreeSet<u16>) {
    for node in nodes {
        match node {
            Node::Directive { name, args } if name == "listen" => {
                let Some(addr) = args.first() else { continue };
                if !addr.contains(':') {
                    continue;
                }
                let Some(port_str) = addr.rsplit(':').next() else {
                    continue;
                };
                if let Ok(port) = port_str.parse::<u16>() {
                    if port != control_port {
                        ports.insert(port);
                    }
                }
            }
            Node::Block { children, .. } => walk(children, control_port, ports),
            Node::Directive { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL_PORT: u16 = 8099;

    fn http_conf() -> ConfTree {
        ConfTree::parse(
            "http {\n    server {\n        listen 0.0.0.0:8080;\n        location / { proxy_pass http://app; }\n    }\n}\n",
        )
        .unwrap()
    }

    #[test]
    fn marker_lands_inside_existing_http_block() {
        let artifact = create_version_artifact(http_conf(), "v1", CONTROL_PORT);

        let Node::Block { children, .. } = &artifact.nodes[0] else {
            panic!("expected http block");
        };
        let marker = children.last().unwrap();
        assert_eq!(marker.name(), "server");

        let rendered = artifact.render();
        assert!(rendered.contains(&format!("listen {CONTROL_PORT};")));
        assert!(rendered.contains("return 200 \"v1\";"));
    }

    #[test]
    fn marker_gets_synthesized_http_wrapper() {
        let base = ConfTree::parse("events {\n    worker_connections 512;\n}\n").unwrap();
        let artifact = create_version_artifact(base, "v2", CONTROL_PORT);

        assert_eq!(artifact.nodes.len(), 2);
        let Node::Block { name, children, .. } = &artifact.nodes[1] else {
            panic!("expected synthesized block");
        };
        assert_eq!(name, "http");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "server");
    }

    #[test]
    fn marker_artifact_roundtrips_through_text() {
        let artifact = create_version_artifact(http_conf(), "v1", CONTROL_PORT);
        let reparsed = ConfTree::parse(&artifact.render()).unwrap();
        assert_eq!(reparsed, artifact);
    }

    #[test]
    fn no_listen_directives_defaults_to_port_80() {
        let tree = ConfTree::parse("events { worker_connections 512; }\n").unwrap();
        assert_eq!(
            extract_exposed_ports(&tree, CONTROL_PORT),
            BTreeSet::from([80])
        );
    }

    #[test]
    fn control_port_is_excluded() {
        let artifact = create_version_artifact(http_conf(), "v1", CONTROL_PORT);
        // The artifact now has both the 8080 listener and the marker's
        // control-port listener; only 8080 counts as exposed.
        assert_eq!(
            extract_exposed_ports(&artifact, CONTROL_PORT),
            BTreeSet::from([8080])
        );
    }

    #[test]
    fn bare_port_listen_is_not_extracted() {
        let tree = ConfTree::parse("http { server { listen 8080; } }\n").unwrap();
        assert_eq!(
            extract_exposed_ports(&tree, CONTROL_PORT),
            BTreeSet::from([80])
        );
    }

    #[test]
    fn deeply_nested_listens_are_collected() {
        let tree = ConfTree::parse(
            "http {\n    server { listen 0.0.0.0:443; }\n    server { listen [::]:8443; }\n}\n",
        )
        .unwrap();
        assert_eq!(
            extract_exposed_ports(&tree, CONTROL_PORT),
            BTreeSet::from([443, 8443])
        );
    }

    #[test]
    fn non_numeric_port_suffix_is_ignored() {
        let tree = ConfTree::parse("server { listen unix:/var/run/nginx.sock; }\n").unwrap();
        assert_eq!(
            extract_exposed_ports(&tree, CONTROL_PORT),
            BTreeSet::from([80])
        );
    }
}
