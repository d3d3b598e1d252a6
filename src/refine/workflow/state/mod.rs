// SPDX-License-Identifier: MIT

//! State management for the refinement pipeline
//!
//! This module provides:
//! - `StateSchema` - the fixed set of pipeline fields with types and defaults
//! - `PipelineState` - runtime state storage with reducer support
//! - `StateUpdate` - the partial update a node returns
//! - `Message` - a role-tagged conversation record

mod message;
mod schema;
mod store;

pub use message::{Message, Role};
pub use schema::{
    fields, FieldType, ReducerType, StateFieldDef, StateSchema, DEFAULT_SEARCH_DAYS_LIMIT,
    PIPELINE_SCHEMA,
};
pub use store::{PipelineState, StateUpdate};
