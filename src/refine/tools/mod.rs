// SPDX-License-Identifier: MIT

//! Concrete collaborators for the pipeline nodes
//!
//! - [`PsearchTool`] - web search through the `psearch` CLI
//! - [`CommandReviewer`] - review through a CLI reading its prompt on stdin
//! - [`SlackNotifier`] - incoming-webhook notification

mod psearch;
mod review;
mod slack;

pub use psearch::PsearchTool;
pub use review::CommandReviewer;
pub use slack::SlackNotifier;
