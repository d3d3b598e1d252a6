// SPDX-License-Identifier: MIT

//! Collaborator traits for the pipeline's external tools.
//!
//! Each trait is the narrow interface a node calls; concrete implementations
//! live in `refine::tools`. All calls are awaited to completion by the caller
//! and any timeout is the implementation's business.

use crate::adk::error::AdapterError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A search query plus the recency filter detected from the user's question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Restrict results to recent content
    pub recent: bool,
    /// Size of the recency window in days (only used when `recent` is set)
    pub days_limit: u32,
}

/// Captured output of a successful search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutput {
    pub text: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// Material handed to the reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// The question the pipeline was asked
    pub question: String,
    /// First answer produced by the pipeline
    pub before: String,
    /// Final answer produced by the pipeline
    pub after: String,
}

/// Runs a search and returns its captured text output
#[async_trait]
pub trait Searcher: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<SearchOutput, AdapterError>;
}

/// Reviews the pipeline's output and returns the review text
#[async_trait]
pub trait Reviewer: Send + Sync {
    fn name(&self) -> &str;

    async fn review(&self, request: &ReviewRequest) -> Result<String, AdapterError>;
}

/// Delivers a finished-run notification
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, text: &str) -> Result<(), AdapterError>;
}
