// SPDX-License-Identifier: MIT

//! Model module - defines the inference model trait and implementations
//!
//! The pipeline only needs single-shot text generation plus a readiness
//! probe that is run before any node executes. Implementations:
//! - [ollama] - a local Ollama server

pub mod ollama;

use crate::adk::error::AdapterError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

/// Core trait for inference model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Identifier of the served model (e.g. `gpt-oss:20b`)
    fn name(&self) -> &str;

    /// Generate a completion for a single prompt
    async fn generate(
        &self,
        prompt: &str,
        config: Option<&GenerationConfig>,
    ) -> Result<String, AdapterError>;

    /// Verify the endpoint is reachable and serves this model
    async fn check_ready(&self) -> Result<(), AdapterError>;
}
