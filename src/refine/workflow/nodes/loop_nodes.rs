// SPDX-License-Identifier: MIT

//! Nodes on the refinement loop: Input, Processing, Decision, Continuation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Local};

use super::Node;
use crate::adk::error::NodeError;
use crate::adk::model::{GenerationConfig, Model};
use crate::refine::workflow::graph::NodeId;
use crate::refine::workflow::prompts;
use crate::refine::workflow::recency;
use crate::refine::workflow::state::{fields, Message, PipelineState, StateUpdate};

/// Records the current `user_input` as a user message
///
/// On the first pass it also remembers the question and decides whether the
/// search should be restricted to recent results.
#[derive(Debug, Default)]
pub struct InputNode;

impl InputNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for InputNode {
    fn id(&self) -> NodeId {
        NodeId::Input
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let input = state.user_input();
        let iteration = state.iteration();
        log::info!("Input (iteration {}): {} chars", iteration, input.chars().count());

        let mut update = StateUpdate::new().push_message(Message::user(input));

        if iteration == 0 {
            let hint = recency::detect(input, Local::now().year());
            update = update
                .set(fields::ORIGINAL_USER_INPUT, input)
                .set(fields::RECENT_SEARCH_MODE, hint.recent)
                .set(fields::SEARCH_DAYS_LIMIT, hint.days_limit);
        }

        Ok(update)
    }
}

/// Produces a refined answer for the current `user_input`
pub struct ProcessingNode {
    model: Arc<dyn Model>,
    generation: GenerationConfig,
    fallback_on_error: bool,
}

impl ProcessingNode {
    pub fn new(model: Arc<dyn Model>, generation: GenerationConfig) -> Self {
        Self {
            model,
            generation,
            fallback_on_error: true,
        }
    }

    /// When disabled, an inference failure aborts the run
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_error = enabled;
        self
    }
}

#[async_trait]
impl Node for ProcessingNode {
    fn id(&self) -> NodeId {
        NodeId::Processing
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let iteration = state.iteration();
        let input = state.user_input();
        let prompt =
            prompts::processing_prompt(input, state.search_results(), iteration, Local::now());

        log::info!(
            "Processing iteration {} with model {}",
            iteration,
            self.model.name()
        );

        let output = match self.model.generate(&prompt, Some(&self.generation)).await {
            Ok(text) if text.trim().is_empty() => {
                log::warn!("Model {} returned an empty response", self.model.name());
                prompts::EMPTY_RESPONSE_PLACEHOLDER.to_string()
            }
            Ok(text) => text,
            Err(e) if self.fallback_on_error => {
                log::warn!("Inference failed, using fallback response: {}", e);
                prompts::fallback_response(iteration, input)
            }
            Err(e) => return Err(e.into()),
        };

        let mut update = StateUpdate::new().set(fields::PROCESSED_OUTPUT, output.as_str());
        if iteration == 0 {
            update = update.set(fields::INITIAL_OUTPUT, output);
        }
        Ok(update)
    }
}

/// Decides whether another pass is needed
///
/// Compares the counter before Continuation has incremented it, so
/// `max_iterations = 0` means a single pass.
#[derive(Debug)]
pub struct DecisionNode {
    max_iterations: u32,
}

impl DecisionNode {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

#[async_trait]
impl Node for DecisionNode {
    fn id(&self) -> NodeId {
        NodeId::Decision
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let iteration = state.iteration();
        let should_continue = iteration < self.max_iterations;
        log::info!(
            "Decision: iteration {}/{} -> {}",
            iteration,
            self.max_iterations,
            if should_continue { "continue" } else { "stop" }
        );

        Ok(StateUpdate::new()
            .set(fields::SHOULD_CONTINUE, should_continue)
            .push_message(Message::assistant(state.processed_output())))
    }
}

/// Advances the counter and turns the last answer into the next input
#[derive(Debug, Default)]
pub struct ContinuationNode;

impl ContinuationNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for ContinuationNode {
    fn id(&self) -> NodeId {
        NodeId::Continuation
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let next = state.iteration() + 1;
        log::info!("Continuation: starting iteration {}", next);

        Ok(StateUpdate::new()
            .set(fields::ITERATION, next)
            .set(
                fields::USER_INPUT,
                prompts::continuation_input(next, state.processed_output()),
            ))
    }
}
