// SPDX-License-Identifier: MIT

//! Runtime settings
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! environment variables. Command line flags are applied by the binary on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::adk::error::ConfigError;
use crate::adk::model::GenerationConfig;

/// Environment variables read by [`Settings::apply_overrides`]
pub mod env_keys {
    pub const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
    pub const OLLAMA_MODEL: &str = "OLLAMA_MODEL";
    pub const MAX_ITERATIONS: &str = "REFINE_MAX_ITERATIONS";
    pub const DOCS_DIR: &str = "REFINE_DOCS_DIR";
    pub const SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub base_url: String,
    pub name: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    pub request_timeout_secs: u64,
    /// Degrade to a canned answer instead of aborting when inference fails
    pub fallback_on_error: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            name: "gpt-oss:20b".to_string(),
            temperature: 0.7,
            max_output_tokens: None,
            request_timeout_secs: 300,
            fallback_on_error: true,
        }
    }
}

impl ModelSettings {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: Some(self.temperature),
            max_output_tokens: self.max_output_tokens,
            ..GenerationConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    pub max_iterations: u32,
    /// Run Search, Review and Documentation as well
    pub extended: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            extended: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub program: String,
    pub timeout_secs: u64,
    /// Maximum characters of search output kept in state
    pub result_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            program: "psearch".to_string(),
            timeout_secs: 120,
            result_limit: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            args: vec!["-p".to_string()],
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationSettings {
    pub dir: PathBuf,
}

impl Default for DocumentationSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("Docs"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub slack_webhook_url: Option<String>,
}

/// All runtime settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub workflow: WorkflowSettings,
    pub search: SearchSettings,
    pub review: ReviewSettings,
    pub documentation: DocumentationSettings,
    pub notification: NotificationSettings,
}

impl Settings {
    /// Defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => {
                log::info!("Loading settings from {}", path.display());
                Self::from_yaml(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply environment-style overrides; `lookup` returns the variable's value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(env_keys::OLLAMA_BASE_URL) {
            self.model.base_url = url;
        }
        if let Some(name) = lookup(env_keys::OLLAMA_MODEL) {
            self.model.name = name;
        }
        if let Some(raw) = lookup(env_keys::MAX_ITERATIONS) {
            self.workflow.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::invalid_value(
                    env_keys::MAX_ITERATIONS,
                    format!("'{}' is not a non-negative integer", raw),
                )
            })?;
        }
        if let Some(dir) = lookup(env_keys::DOCS_DIR) {
            self.documentation.dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(env_keys::SLACK_WEBHOOK_URL) {
            self.notification.slack_webhook_url = Some(url);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.model.base_url)
            .map_err(|e| ConfigError::invalid_url("model.base_url", e.to_string()))?;
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::invalid_value(
                "model.temperature",
                format!("{} is outside 0.0..=2.0", self.model.temperature),
            ));
        }
        if self.search.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "search.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.review.command.trim().is_empty() {
            return Err(ConfigError::invalid_value("review.command", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model.name, "gpt-oss:20b");
        assert_eq!(settings.model.base_url, "http://localhost:11434");
        assert_eq!(settings.model.temperature, 0.7);
        assert_eq!(settings.workflow.max_iterations, 2);
        assert_eq!(settings.search.timeout_secs, 120);
        assert_eq!(settings.search.result_limit, 2000);
        assert_eq!(settings.documentation.dir, PathBuf::from("Docs"));
        assert!(settings.notification.slack_webhook_url.is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
model:
  name: llama3
workflow:
  max_iterations: 4
  extended: true
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.model.name, "llama3");
        assert_eq!(settings.model.base_url, "http://localhost:11434");
        assert_eq!(settings.workflow.max_iterations, 4);
        assert!(settings.workflow.extended);
        assert_eq!(settings.review.command, "claude");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Settings::from_yaml("workflow: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (env_keys::OLLAMA_MODEL, "qwen3"),
            (env_keys::MAX_ITERATIONS, "5"),
            (env_keys::DOCS_DIR, "/tmp/reports"),
            (env_keys::SLACK_WEBHOOK_URL, "https://hooks.slack.com/services/a"),
            (env_keys::OLLAMA_BASE_URL, ""),
        ]);

        let mut settings = Settings::default();
        settings
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.model.name, "qwen3");
        assert_eq!(settings.model.base_url, "http://localhost:11434");
        assert_eq!(settings.workflow.max_iterations, 5);
        assert_eq!(settings.documentation.dir, PathBuf::from("/tmp/reports"));
        assert_eq!(
            settings.notification.slack_webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/a")
        );
    }

    #[test]
    fn test_bad_iteration_override() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(|k| (k == env_keys::MAX_ITERATIONS).then(|| "-1".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.model.base_url = "nope".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.model.temperature = 3.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"search:\n  result_limit: 500\n").unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.search.result_limit, 500);
    }
}
