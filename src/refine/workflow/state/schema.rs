// SPDX-License-Identifier: MIT

//! State schema definitions

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Field names of the pipeline state
pub mod fields {
    pub const MESSAGES: &str = "messages";
    pub const ITERATION: &str = "iteration";
    pub const USER_INPUT: &str = "user_input";
    pub const ORIGINAL_USER_INPUT: &str = "original_user_input";
    pub const PROCESSED_OUTPUT: &str = "processed_output";
    pub const SHOULD_CONTINUE: &str = "should_continue";
    pub const SEARCH_RESULTS: &str = "search_results";
    pub const RECENT_SEARCH_MODE: &str = "recent_search_mode";
    pub const SEARCH_DAYS_LIMIT: &str = "search_days_limit";
    pub const INITIAL_OUTPUT: &str = "initial_output";
    pub const REVIEWED_OUTPUT: &str = "reviewed_output";
    pub const DOCUMENT_GENERATED: &str = "document_generated";
    pub const DOCUMENT_CONTENT: &str = "document_content";
    pub const DOCUMENT_PATH: &str = "document_path";
    pub const NOTIFICATION_SENT: &str = "notification_sent";
}

/// Default recency window for searches, in days
pub const DEFAULT_SEARCH_DAYS_LIMIT: u32 = 60;

/// Schema defining the pipeline state structure
#[derive(Debug, Clone, Serialize, Default)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: BTreeMap<String, StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Serialize)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    pub reducer: ReducerType,
    /// Value at run start
    pub default: Value,
    /// Whether `null` is an accepted value
    pub nullable: bool,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Array,
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
}

impl FieldType {
    /// Check whether a JSON value has this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value
                .as_u64()
                .is_some_and(|n| u32::try_from(n).is_ok()),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Integer => "a non-negative 32-bit integer",
            FieldType::Boolean => "a boolean",
            FieldType::Array => "an array",
        }
    }
}

impl StateSchema {
    fn with(mut self, name: &str, field_type: FieldType, default: Value) -> Self {
        self.fields.insert(
            name.to_string(),
            StateFieldDef {
                field_type,
                reducer: ReducerType::Overwrite,
                default,
                nullable: false,
            },
        );
        self
    }

    fn nullable(mut self, name: &str) -> Self {
        if let Some(def) = self.fields.get_mut(name) {
            def.nullable = true;
        }
        self
    }

    fn reducer(mut self, name: &str, reducer: ReducerType) -> Self {
        if let Some(def) = self.fields.get_mut(name) {
            def.reducer = reducer;
        }
        self
    }

    /// Look up a field definition
    pub fn field(&self, name: &str) -> Option<&StateFieldDef> {
        self.fields.get(name)
    }
}

/// The schema every pipeline run starts from
pub static PIPELINE_SCHEMA: Lazy<StateSchema> = Lazy::new(|| {
    use fields::*;

    StateSchema::default()
        .with(MESSAGES, FieldType::Array, json!([]))
        .reducer(MESSAGES, ReducerType::Append)
        .with(ITERATION, FieldType::Integer, json!(0))
        .with(USER_INPUT, FieldType::String, json!(""))
        .with(ORIGINAL_USER_INPUT, FieldType::String, json!(""))
        .with(PROCESSED_OUTPUT, FieldType::String, json!(""))
        .with(SHOULD_CONTINUE, FieldType::Boolean, json!(false))
        .with(SEARCH_RESULTS, FieldType::String, Value::Null)
        .nullable(SEARCH_RESULTS)
        .with(RECENT_SEARCH_MODE, FieldType::Boolean, json!(false))
        .with(
            SEARCH_DAYS_LIMIT,
            FieldType::Integer,
            json!(DEFAULT_SEARCH_DAYS_LIMIT),
        )
        .with(INITIAL_OUTPUT, FieldType::String, json!(""))
        .with(REVIEWED_OUTPUT, FieldType::String, json!(""))
        .with(DOCUMENT_GENERATED, FieldType::Boolean, json!(false))
        .with(DOCUMENT_CONTENT, FieldType::String, json!(""))
        .with(DOCUMENT_PATH, FieldType::String, json!(""))
        .with(NOTIFICATION_SENT, FieldType::Boolean, json!(false))
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_schema_fields() {
        assert_eq!(PIPELINE_SCHEMA.fields.len(), 15);
        assert_eq!(
            PIPELINE_SCHEMA.field(fields::MESSAGES).unwrap().reducer,
            ReducerType::Append
        );
        assert_eq!(
            PIPELINE_SCHEMA.field(fields::ITERATION).unwrap().reducer,
            ReducerType::Overwrite
        );
        assert!(PIPELINE_SCHEMA.field("nonexistent").is_none());
    }

    #[test]
    fn test_only_search_results_is_nullable() {
        let nullable: Vec<&str> = PIPELINE_SCHEMA
            .fields
            .iter()
            .filter(|(_, def)| def.nullable)
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(nullable, vec![fields::SEARCH_RESULTS]);
    }

    #[test]
    fn test_defaults_match_their_types() {
        for (name, def) in &PIPELINE_SCHEMA.fields {
            assert!(
                def.field_type.accepts(&def.default) || (def.nullable && def.default.is_null()),
                "default of {} has the wrong type",
                name
            );
        }
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::Integer.accepts(&json!(3)));
        assert!(!FieldType::Integer.accepts(&json!(-1)));
        assert!(FieldType::Integer.accepts(&json!(u32::MAX)));
        assert!(!FieldType::Integer.accepts(&json!(u64::from(u32::MAX) + 1)));
        assert!(!FieldType::Integer.accepts(&json!("3")));
        assert!(FieldType::String.accepts(&json!("x")));
        assert!(FieldType::Boolean.accepts(&json!(true)));
        assert!(FieldType::Array.accepts(&json!([])));
    }

    #[test]
    fn test_schema_serializes_flat() {
        let value = serde_json::to_value(&*PIPELINE_SCHEMA).unwrap();
        assert_eq!(value["messages"]["type"], "array");
        assert_eq!(value["messages"]["reducer"], "append");
        assert_eq!(value["search_days_limit"]["default"], 60);
    }
}
