// SPDX-License-Identifier: MIT

//! refine-rs - an iterative refinement pipeline over a local language model
//!
//! - [`adk`] holds the collaborator boundary: error types, the inference
//!   model trait and the search/review/notification adapter traits.
//! - [`refine`] holds the pipeline itself: state, nodes, router, executor,
//!   configuration, the concrete tools and the HTTP server.

pub mod adk;
pub mod refine;
