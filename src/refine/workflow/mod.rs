// SPDX-License-Identifier: MIT

pub mod builder;
pub mod document;
pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod recency;
pub mod state;
