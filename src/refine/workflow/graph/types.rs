// SPDX-License-Identifier: MIT

//! Graph type definitions
//!
//! Node identities form a closed set and the edges between them are fixed
//! per topology; nothing is registered at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a pipeline node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Input,
    Search,
    Processing,
    Decision,
    Continuation,
    Review,
    Documentation,
    Notification,
    /// Terminal marker; has no implementation
    End,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Input => "input",
            NodeId::Search => "search",
            NodeId::Processing => "processing",
            NodeId::Decision => "decision",
            NodeId::Continuation => "continuation",
            NodeId::Review => "review",
            NodeId::Documentation => "documentation",
            NodeId::Notification => "notification",
            NodeId::End => "end",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing edge of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Always go to this node
    Static(NodeId),
    /// Ask the router
    Routed,
}

/// Which fixed graph to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    /// Input → Processing → Decision → {Continuation → Input | End}
    #[default]
    Basic,
    /// Input → Search → Processing → Decision → {Continuation → Input |
    /// Review → Documentation → (Notification →) End}
    Extended { notify: bool },
}

impl Topology {
    /// Node every run starts at
    pub fn entry(&self) -> NodeId {
        NodeId::Input
    }

    /// Nodes that need an implementation, in visiting order
    pub fn nodes(&self) -> Vec<NodeId> {
        use NodeId::*;
        match self {
            Topology::Basic => vec![Input, Processing, Decision, Continuation],
            Topology::Extended { notify } => {
                let mut nodes = vec![
                    Input,
                    Search,
                    Processing,
                    Decision,
                    Continuation,
                    Review,
                    Documentation,
                ];
                if *notify {
                    nodes.push(Notification);
                }
                nodes
            }
        }
    }

    /// Whether a node belongs to this topology
    pub fn contains(&self, node: NodeId) -> bool {
        node == NodeId::End || self.nodes().contains(&node)
    }

    /// Where the decision node goes once the loop is finished
    pub fn terminal_successor(&self) -> NodeId {
        match self {
            Topology::Basic => NodeId::End,
            Topology::Extended { .. } => NodeId::Review,
        }
    }

    /// Outgoing edge of `from`; `None` for End and for nodes outside the topology
    pub fn next(&self, from: NodeId) -> Option<Edge> {
        if from == NodeId::End || !self.contains(from) {
            return None;
        }

        let edge = match (self, from) {
            (Topology::Extended { .. }, NodeId::Input) => Edge::Static(NodeId::Search),
            (_, NodeId::Input) => Edge::Static(NodeId::Processing),
            (_, NodeId::Search) => Edge::Static(NodeId::Processing),
            (_, NodeId::Processing) => Edge::Static(NodeId::Decision),
            (_, NodeId::Decision) => Edge::Routed,
            (_, NodeId::Continuation) => Edge::Static(NodeId::Input),
            (_, NodeId::Review) => Edge::Static(NodeId::Documentation),
            (Topology::Extended { notify: true }, NodeId::Documentation) => {
                Edge::Static(NodeId::Notification)
            }
            (_, NodeId::Documentation) => Edge::Static(NodeId::End),
            (_, NodeId::Notification) => Edge::Static(NodeId::End),
            (_, NodeId::End) => return None,
        };
        Some(edge)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Basic => f.write_str("basic"),
            Topology::Extended { notify: false } => f.write_str("extended"),
            Topology::Extended { notify: true } => f.write_str("extended+notify"),
        }
    }
}
