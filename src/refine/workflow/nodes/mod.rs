// SPDX-License-Identifier: MIT

//! Node module - the fixed set of pipeline steps
//!
//! Every node reads the current state and returns a partial update; none of
//! them mutate the state directly. Nodes that call an external collaborator
//! absorb its failures and record a degraded value instead, except where a
//! node is explicitly configured to abort.
//! - [`loop_nodes`] - Input, Processing, Decision, Continuation
//! - [`search`] - Search
//! - [`review`] - Review
//! - [`report`] - Documentation, Notification

mod loop_nodes;
mod report;
mod review;
mod search;

pub use loop_nodes::{ContinuationNode, DecisionNode, InputNode, ProcessingNode};
pub use report::{DocumentationNode, NotificationNode};
pub use review::ReviewNode;
pub use search::SearchNode;

use crate::adk::error::NodeError;
use crate::refine::workflow::graph::NodeId;
use crate::refine::workflow::state::{PipelineState, StateUpdate};
use async_trait::async_trait;

/// Core node trait for all pipeline steps
#[async_trait]
pub trait Node: Send + Sync {
    /// Which graph position this node fills
    fn id(&self) -> NodeId;

    /// Run the node against a read-only view of the state
    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError>;
}
