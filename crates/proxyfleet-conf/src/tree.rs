//! Tagged configuration tree.
//!
//! An nginx configuration is an ordered sequence of nodes; each node is
//! either a simple directive (`listen 0.0.0.0:8080;`) or a named block
//! with children (`http { ... }`). The variant tag replaces the
//! string-introspection the control plane would otherwise need.

use serde::{Deserialize, Serialize};

use crate::parse;
use crate::ConfResult;

/// One statement in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Directive {
        name: String,
        args: Vec<String>,
    },
    Block {
        name: String,
        args: Vec<String>,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn directive(name: &str, args: &[&str]) -> Self {
        Node::Directive {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn block(name: &str, args: &[&str], children: Vec<Node>) -> Self {
        Node::Block {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Directive { name, .. } | Node::Block { name, .. } => name,
        }
    }
}

/// A whole configuration file: an ordered sequence of top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfTree {
    pub nodes: Vec<Node>,
}

impl ConfTree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Parse nginx-grammar configuration text.
    pub fn parse(text: &str) -> ConfResult<Self> {
        parse::parse(text)
    }

    /// Render back to configuration text (4-space indentation, one
    /// statement per line; comments are not preserved).
    pub fn render(&self) -> String {
        parse::render(self)
    }
}
