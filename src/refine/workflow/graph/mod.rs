// SPDX-License-Identifier: MIT

//! Graph-based pipeline execution
//!
//! This module provides the fixed-topology executor that runs nodes along
//! static edges, consulting the router only at the decision node.

mod events;
pub mod executor;
mod router;
pub mod types;

pub use events::PipelineEvent;
pub use executor::Pipeline;
pub use router::Router;
pub use types::{Edge, NodeId, Topology};
