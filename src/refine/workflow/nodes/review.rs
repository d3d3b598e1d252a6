// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use super::Node;
use crate::adk::error::NodeError;
use crate::adk::tool::{ReviewRequest, Reviewer};
use crate::refine::workflow::graph::NodeId;
use crate::refine::workflow::state::{fields, PipelineState, StateUpdate};

/// Asks the reviewer to compare the first and final answers
pub struct ReviewNode {
    reviewer: Arc<dyn Reviewer>,
}

impl ReviewNode {
    pub fn new(reviewer: Arc<dyn Reviewer>) -> Self {
        Self { reviewer }
    }
}

#[async_trait]
impl Node for ReviewNode {
    fn id(&self) -> NodeId {
        NodeId::Review
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let after = state.processed_output();
        if after.trim().is_empty() {
            log::warn!("Nothing to review, skipping {}", self.reviewer.name());
            return Ok(StateUpdate::new().set(fields::REVIEWED_OUTPUT, ""));
        }

        let request = ReviewRequest {
            question: state.question().to_string(),
            before: state.initial_output().to_string(),
            after: after.to_string(),
        };

        log::info!("Reviewing output with {}", self.reviewer.name());
        let reviewed = match self.reviewer.review(&request).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Review failed, keeping the unreviewed output: {}", e);
                request.after
            }
        };

        Ok(StateUpdate::new().set(fields::REVIEWED_OUTPUT, reviewed))
    }
}
