// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use super::Node;
use crate::adk::error::NodeError;
use crate::adk::tool::{SearchRequest, Searcher};
use crate::refine::workflow::graph::NodeId;
use crate::refine::workflow::state::{fields, PipelineState, StateUpdate};

/// Runs the external search for the current `user_input`
///
/// A failed search never aborts the run: the failure is recorded in
/// `search_results` and processing goes ahead with it.
pub struct SearchNode {
    searcher: Arc<dyn Searcher>,
}

impl SearchNode {
    pub fn new(searcher: Arc<dyn Searcher>) -> Self {
        Self { searcher }
    }
}

#[async_trait]
impl Node for SearchNode {
    fn id(&self) -> NodeId {
        NodeId::Search
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let request = SearchRequest {
            query: state.user_input().to_string(),
            recent: state.recent_search_mode(),
            days_limit: state.search_days_limit(),
        };

        log::info!(
            "Searching with {} (recent: {}, days: {})",
            self.searcher.name(),
            request.recent,
            request.days_limit
        );

        let results = match self.searcher.search(&request).await {
            Ok(output) => {
                log::info!(
                    "Search finished in {:.2}s ({} chars)",
                    output.elapsed.as_secs_f64(),
                    output.text.chars().count()
                );
                output.text
            }
            Err(e) => {
                log::warn!("Search failed, continuing without results: {}", e);
                format!("Search failed: {e}")
            }
        };

        Ok(StateUpdate::new().set(fields::SEARCH_RESULTS, results))
    }
}
