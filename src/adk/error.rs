// SPDX-License-Identifier: MIT

//! Typed error handling for refine-rs
//!
//! Errors are split by who is allowed to absorb them:
//! - [`AdapterError`] is raised by an external collaborator and is normally
//!   absorbed by the node that called it (the node degrades its output).
//! - [`NodeError`] escapes a node and aborts the run.
//! - [`RefineError`] is what a caller of the pipeline sees.

use thiserror::Error;

/// Top-level error type for refine-rs
#[derive(Debug, Error)]
pub enum RefineError {
    /// A required external service is unreachable; raised before any node runs
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A node failed in a way it could not degrade from; the run is aborted
    #[error("Node '{node}' failed: {source}")]
    Executor {
        node: String,
        #[source]
        source: NodeError,
    },

    /// The graph could not be assembled
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures of external collaborators (search process, model endpoint,
/// review command, webhook)
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Non-success answer from an HTTP service
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// The configured model is not served by the endpoint
    #[error("Model '{model}' is not available (available: {available:?})")]
    ModelUnavailable {
        model: String,
        available: Vec<String>,
    },

    /// An external process exited unsuccessfully
    #[error("Command '{command}' exited with status {code:?}: {stderr}")]
    ProcessFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external process did not finish in time
    #[error("Command '{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// The collaborator answered with nothing usable
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// I/O errors (spawning processes, pipes)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors that escape a node and abort the run
#[derive(Debug, Error)]
pub enum NodeError {
    /// An adapter failure the node is configured not to absorb
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The node produced an update the state rejected
    #[error(transparent)]
    State(#[from] StateError),

    /// An executor invariant was broken while running the node
    #[error("Invariant violated: {0}")]
    Invariant(String),
}

/// Errors raised by the state container when merging an update
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    /// The update names a field the schema does not define
    #[error("Unknown state field: {0}")]
    UnknownField(String),

    /// The update carries a value of the wrong shape for the field
    #[error("Field '{field}' expects {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
}

/// Errors raised while assembling a pipeline graph
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// A node required by the topology has no implementation
    #[error("Missing implementation for node '{0}'")]
    MissingNode(String),

    /// An implementation was supplied for a node the topology never visits
    #[error("Node '{0}' is not part of the {1} topology")]
    UnexpectedNode(String, String),

    /// Two implementations were supplied for the same node
    #[error("Duplicate implementation for node '{0}'")]
    DuplicateNode(String),
}

/// Configuration errors (unreadable file, bad YAML, invalid values)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// A URL setting failed to parse or has the wrong shape
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl { field: String, reason: String },

    /// Any other out-of-range setting
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl AdapterError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl RefineError {
    /// Wrap a node failure with the id of the node that raised it
    pub fn executor(node: impl Into<String>, source: impl Into<NodeError>) -> Self {
        Self::Executor {
            node: node.into(),
            source: source.into(),
        }
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

impl ConfigError {
    pub fn invalid_url(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
