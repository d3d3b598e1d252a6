// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::adk::error::{AdapterError, ConfigError};
use crate::adk::tool::Notifier;

const PROVIDER: &str = "slack";
const WEBHOOK_HOST: &str = "hooks.slack.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts to a Slack incoming webhook
///
/// One attempt per notification; a failure is reported to the caller and
/// never retried.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(webhook_url)
            .map_err(|e| ConfigError::invalid_url("notification.slack_webhook_url", e.to_string()))?;
        if parsed.scheme() != "https" || parsed.host_str() != Some(WEBHOOK_HOST) {
            return Err(ConfigError::invalid_url(
                "notification.slack_webhook_url",
                format!("expected https://{}/...", WEBHOOK_HOST),
            ));
        }

        Ok(Self::with_endpoint(webhook_url))
    }

    fn with_endpoint(webhook_url: &str) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }

    fn payload(text: &str) -> Value {
        json!({
            "text": text,
            "username": "refine-rs",
            "icon_emoji": ":robot_face:",
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn notify(&self, text: &str) -> Result<(), AdapterError> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&Self::payload(text))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdapterError::api(
                PROVIDER,
                format!("HTTP {}: {}", status, body),
            ));
        }

        log::debug!("Slack webhook accepted {} chars", text.chars().count());
        Ok(())
    }
}
