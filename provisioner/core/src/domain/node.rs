// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Node table
//!
//! A node is one deployment target. The table is persisted as a flat text
//! file, one node per line:
//!
//! ```text
//! <ip> <id> <fqdn> [<instance-id> [<unit-id>]]
//! ```
//!
//! Trailing runtime ids are present only while the node's containers run.

use crate::domain::container::{InstanceId, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("Invalid node id '{0}': ids must be non-empty and must not contain whitespace, '/' or '..'")]
    InvalidId(String),

    #[error("Unknown node '{0}'. Create it first with `susi-dev create {0}`")]
    UnknownNode(String),

    #[error("Invalid node {field} '{value}': must be non-empty and must not contain whitespace")]
    InvalidField { field: &'static str, value: String },
}

/// Checks a free-form node field (ip or fqdn) fits one column of the node table
pub fn check_field(field: &'static str, value: &str) -> Result<(), NodeError> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(NodeError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Result<Self, NodeError> {
        let id = id.into();
        if id.is_empty()
            || id.contains('/')
            || id.contains("..")
            || id.chars().any(char::is_whitespace)
        {
            return Err(NodeError::InvalidId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeId::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub ip: String,
    pub fqdn: String,
    pub instance_id: Option<InstanceId>,
    pub unit_id: Option<UnitId>,
}

impl Node {
    pub fn new(id: NodeId, ip: impl Into<String>, fqdn: impl Into<String>) -> Self {
        Self {
            id,
            ip: ip.into(),
            fqdn: fqdn.into(),
            instance_id: None,
            unit_id: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.unit_id.is_some()
    }

    fn parse_line(line: &str) -> Option<Result<Self, NodeError>> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if !(3..=5).contains(&fields.len()) {
            return None;
        }
        let id = match NodeId::new(fields[1]) {
            Ok(id) => id,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(Self {
            id,
            ip: fields[0].to_string(),
            fqdn: fields[2].to_string(),
            instance_id: fields.get(3).map(|s| InstanceId::new(*s)),
            unit_id: fields.get(4).map(|s| UnitId::new(*s)),
        }))
    }

    fn to_line(&self) -> String {
        let mut fields = vec![self.ip.as_str(), self.id.as_str(), self.fqdn.as_str()];
        // A unit id without an instance id cannot be represented positionally.
        match (&self.instance_id, &self.unit_id) {
            (Some(instance), Some(unit)) => {
                fields.push(instance.as_str());
                fields.push(unit.as_str());
            }
            (Some(instance), None) => fields.push(instance.as_str()),
            (None, _) => {}
        }
        fields.join(" ")
    }
}

/// All known nodes, ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTable {
    nodes: BTreeMap<NodeId, Node>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the flat-file format. Malformed lines are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        for (index, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match Node::parse_line(trimmed) {
                Some(Ok(node)) => table.set(node),
                Some(Err(e)) => warn!(line = index + 1, "Skipping node entry: {}", e),
                None => warn!(
                    line = index + 1,
                    "Skipping node entry: expected 3 to 5 fields, got '{}'",
                    trimmed
                ),
            }
        }
        table
    }

    pub fn to_text(&self) -> String {
        self.nodes
            .values()
            .map(|node| node.to_line() + "\n")
            .collect()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn require(&self, id: &NodeId) -> Result<&Node, NodeError> {
        self.nodes
            .get(id)
            .ok_or_else(|| NodeError::UnknownNode(id.to_string()))
    }

    pub fn require_mut(&mut self, id: &NodeId) -> Result<&mut Node, NodeError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| NodeError::UnknownNode(id.to_string()))
    }

    pub fn set(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `/etc/hosts` content resolving every node by id and fqdn
    pub fn render_hosts(&self) -> String {
        let mut hosts: String = self
            .nodes
            .values()
            .map(|node| {
                if node.fqdn == node.id.as_str() {
                    format!("{} {}\n", node.ip, node.id)
                } else {
                    format!("{} {} {}\n", node.ip, node.fqdn, node.id)
                }
            })
            .collect();
        hosts.push_str("127.0.0.1 localhost\n");
        hosts
    }
}

impl FromIterator<Node> for NodeTable {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        let mut table = Self::new();
        for node in iter {
            table.set(node);
        }
        table
    }
}
