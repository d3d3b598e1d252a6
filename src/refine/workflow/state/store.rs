// SPDX-License-Identifier: MIT

//! Runtime state storage for pipeline execution

use serde_json::Value;
use std::collections::BTreeMap;

use super::message::Message;
use super::schema::{fields, ReducerType, StateSchema, PIPELINE_SCHEMA};
use crate::adk::error::StateError;

/// A partial state update produced by a node
///
/// Fields not named in the update are left untouched when it is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    entries: Vec<(String, Value)>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; a later `set` of the same field wins
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.entries.iter().position(|(k, _)| k == field) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((field.to_string(), value)),
        }
        self
    }

    /// Queue a message to be appended to the conversation
    pub fn push_message(mut self, message: Message) -> Self {
        let value = message.to_value();
        let existing = self
            .entries
            .iter()
            .position(|(k, _)| k == fields::MESSAGES);
        match existing.map(|i| &mut self.entries[i].1) {
            Some(Value::Array(items)) => items.push(value),
            Some(other) => *other = Value::Array(vec![value]),
            None => self
                .entries
                .push((fields::MESSAGES.to_string(), Value::Array(vec![value]))),
        }
        self
    }

    /// Get the value an update carries for a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    /// Names of the fields this update touches, in insertion order
    pub fn field_names(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runtime pipeline state with reducer support
#[derive(Debug, Clone)]
pub struct PipelineState {
    /// Current state values
    fields: BTreeMap<String, Value>,
    /// Field definitions
    schema: &'static StateSchema,
}

impl PipelineState {
    /// Create a state with every field at its default
    pub fn new() -> Self {
        let schema: &'static StateSchema = &PIPELINE_SCHEMA;
        let fields = schema
            .fields
            .iter()
            .map(|(name, def)| (name.clone(), def.default.clone()))
            .collect();

        Self { fields, schema }
    }

    /// Create the state a run starts from
    pub fn with_input(user_input: &str) -> Self {
        let mut state = Self::new();
        state
            .fields
            .insert(fields::USER_INPUT.to_string(), Value::from(user_input));
        state
    }

    /// Merge a partial update into the state
    ///
    /// The whole update is validated before anything is written, so a
    /// rejected update leaves the state unchanged.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), StateError> {
        for (key, value) in &update.entries {
            let def = self
                .schema
                .field(key)
                .ok_or_else(|| StateError::UnknownField(key.clone()))?;

            let (accepted, expected) = match def.reducer {
                ReducerType::Overwrite => (
                    def.field_type.accepts(value) || (def.nullable && value.is_null()),
                    def.field_type.describe(),
                ),
                ReducerType::Append => {
                    let accepted = match value {
                        Value::Array(items) => items.iter().all(Message::is_message),
                        item => Message::is_message(item),
                    };
                    (accepted, "a message")
                }
            };
            if !accepted {
                return Err(StateError::TypeMismatch {
                    field: key.clone(),
                    expected,
                });
            }
        }

        for (key, value) in update.entries {
            let reducer = self
                .schema
                .field(&key)
                .map(|def| def.reducer)
                .unwrap_or_default();

            match reducer {
                ReducerType::Overwrite => {
                    self.fields.insert(key, value);
                }
                ReducerType::Append => {
                    let arr = self.fields.entry(key).or_insert(Value::Array(vec![]));
                    if let Value::Array(a) = arr {
                        match value {
                            Value::Array(new_items) => a.extend(new_items),
                            other => a.push(other),
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn str_field(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    fn bool_field(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn iteration(&self) -> u32 {
        self.get(fields::ITERATION)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    }

    pub fn user_input(&self) -> &str {
        self.str_field(fields::USER_INPUT)
    }

    pub fn original_user_input(&self) -> &str {
        self.str_field(fields::ORIGINAL_USER_INPUT)
    }

    pub fn processed_output(&self) -> &str {
        self.str_field(fields::PROCESSED_OUTPUT)
    }

    pub fn should_continue(&self) -> bool {
        self.bool_field(fields::SHOULD_CONTINUE)
    }

    pub fn search_results(&self) -> Option<&str> {
        self.get(fields::SEARCH_RESULTS).and_then(Value::as_str)
    }

    pub fn recent_search_mode(&self) -> bool {
        self.bool_field(fields::RECENT_SEARCH_MODE)
    }

    pub fn search_days_limit(&self) -> u32 {
        self.get(fields::SEARCH_DAYS_LIMIT)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(super::schema::DEFAULT_SEARCH_DAYS_LIMIT)
    }

    pub fn initial_output(&self) -> &str {
        self.str_field(fields::INITIAL_OUTPUT)
    }

    pub fn reviewed_output(&self) -> &str {
        self.str_field(fields::REVIEWED_OUTPUT)
    }

    pub fn document_generated(&self) -> bool {
        self.bool_field(fields::DOCUMENT_GENERATED)
    }

    pub fn document_content(&self) -> &str {
        self.str_field(fields::DOCUMENT_CONTENT)
    }

    pub fn document_path(&self) -> &str {
        self.str_field(fields::DOCUMENT_PATH)
    }

    pub fn notification_sent(&self) -> bool {
        self.bool_field(fields::NOTIFICATION_SENT)
    }

    /// The question the run was started with
    ///
    /// Falls back to `user_input` before the Input node has recorded it.
    pub fn question(&self) -> &str {
        match self.original_user_input() {
            "" => self.user_input(),
            q => q,
        }
    }

    /// Number of conversation messages
    pub fn message_count(&self) -> usize {
        self.get(fields::MESSAGES)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Decode the conversation messages
    pub fn messages(&self) -> Vec<Message> {
        self.get(fields::MESSAGES)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
