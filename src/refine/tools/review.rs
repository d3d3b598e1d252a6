// SPDX-License-Identifier: MIT

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::adk::error::AdapterError;
use crate::adk::tool::{ReviewRequest, Reviewer};
use crate::refine::workflow::prompts;

/// Review through an external command
///
/// The review prompt is written to the command's stdin and its stdout is the
/// review. The default is `claude -p`.
#[derive(Debug, Clone)]
pub struct CommandReviewer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for CommandReviewer {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: vec!["-p".to_string()],
            timeout: Duration::from_secs(300),
        }
    }
}

impl CommandReviewer {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    async fn execute(&self, prompt: String) -> Result<String, AdapterError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    log::debug!("Reviewer closed stdin early: {}", e);
                }
            });
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(AdapterError::ProcessFailed {
                command: self.command.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let review = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if review.is_empty() {
            return Err(AdapterError::EmptyResponse(self.command.clone()));
        }
        Ok(review)
    }
}

#[async_trait]
impl Reviewer for CommandReviewer {
    fn name(&self) -> &str {
        &self.command
    }

    async fn review(&self, request: &ReviewRequest) -> Result<String, AdapterError> {
        let prompt = prompts::review_prompt(
            &request.question,
            &request.before,
            &request.after,
            Local::now(),
        );
        log::info!(
            "Sending {} chars to {} for review",
            prompt.chars().count(),
            self.command
        );

        tokio::time::timeout(self.timeout, self.execute(prompt))
            .await
            .map_err(|_| AdapterError::Timeout {
                command: self.command.clone(),
                secs: self.timeout.as_secs(),
            })?
    }
}
