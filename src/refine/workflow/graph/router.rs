// SPDX-License-Identifier: MIT

use super::types::{NodeId, Topology};
use crate::refine::workflow::state::PipelineState;

/// Chooses the successor of the decision node
///
/// Pure: the answer depends only on `should_continue` and the topology the
/// router was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    terminal: NodeId,
}

impl Router {
    pub fn new(topology: Topology) -> Self {
        Self {
            terminal: topology.terminal_successor(),
        }
    }

    pub fn route(&self, state: &PipelineState) -> NodeId {
        if state.should_continue() {
            NodeId::Continuation
        } else {
            self.terminal
        }
    }
}
