// SPDX-License-Identifier: MIT

//! Documentation and Notification nodes at the tail of the extended graph

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use super::Node;
use crate::adk::error::NodeError;
use crate::adk::tool::Notifier;
use crate::refine::workflow::document;
use crate::refine::workflow::graph::NodeId;
use crate::refine::workflow::state::{fields, PipelineState, StateUpdate};

/// Writes the Markdown report into `docs_dir`
pub struct DocumentationNode {
    docs_dir: PathBuf,
}

impl DocumentationNode {
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
        }
    }

    async fn write(&self, file_name: &str, content: &str) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.docs_dir).await?;
        let path = self.docs_dir.join(file_name);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }
}

#[async_trait]
impl Node for DocumentationNode {
    fn id(&self) -> NodeId {
        NodeId::Documentation
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let content = document::render(state, Local::now());
        let file_name = document::file_name(state.question());

        let update = StateUpdate::new().set(fields::DOCUMENT_CONTENT, content.as_str());
        match self.write(&file_name, &content).await {
            Ok(path) => {
                log::info!("Documentation written to {}", path.display());
                Ok(update
                    .set(fields::DOCUMENT_PATH, path.to_string_lossy().into_owned())
                    .set(fields::DOCUMENT_GENERATED, true))
            }
            Err(e) => {
                log::error!(
                    "Failed to write documentation into {}: {}",
                    self.docs_dir.display(),
                    e
                );
                Ok(update
                    .set(fields::DOCUMENT_PATH, "")
                    .set(fields::DOCUMENT_GENERATED, false))
            }
        }
    }
}

/// Sends a one-shot notification about the finished run
pub struct NotificationNode {
    notifier: Arc<dyn Notifier>,
}

impl NotificationNode {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl Node for NotificationNode {
    fn id(&self) -> NodeId {
        NodeId::Notification
    }

    async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
        let text = document::notification_text(
            state.question(),
            state.document_content(),
            state.document_path(),
        );

        let sent = match self.notifier.notify(&text).await {
            Ok(()) => {
                log::info!("Notification sent via {}", self.notifier.name());
                true
            }
            Err(e) => {
                log::warn!("Notification via {} failed: {}", self.notifier.name(), e);
                false
            }
        };

        Ok(StateUpdate::new().set(fields::NOTIFICATION_SENT, sent))
    }
}
