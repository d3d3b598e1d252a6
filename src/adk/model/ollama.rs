// SPDX-License-Identifier: MIT

//! Ollama Model - local model server implementation

use super::{GenerationConfig, Model};
use crate::adk::error::{AdapterError, ConfigError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const PROVIDER: &str = "ollama";

/// Timeout for the `/api/tags` readiness probe
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama model implementation
pub struct OllamaModel {
    client: Client,
    base_url: String,
    model_name: String,
    request_timeout: Duration,
}

impl OllamaModel {
    /// Create a new OllamaModel talking to `base_url` (e.g. `http://localhost:11434`)
    pub fn new(
        base_url: &str,
        model_name: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ConfigError::invalid_url("model.base_url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::invalid_url(
                "model.base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name: model_name.into(),
            request_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Build the `/api/generate` request body
    fn generate_body(&self, prompt: &str, config: Option<&GenerationConfig>) -> Value {
        let mut options = serde_json::Map::new();
        if let Some(config) = config {
            if let Some(t) = config.temperature {
                options.insert("temperature".into(), json!(t));
            }
            if let Some(n) = config.max_output_tokens {
                options.insert("num_predict".into(), json!(n));
            }
            if let Some(p) = config.top_p {
                options.insert("top_p".into(), json!(p));
            }
            if let Some(k) = config.top_k {
                options.insert("top_k".into(), json!(k));
            }
        }

        let mut body = json!({
            "model": self.model_name,
            "prompt": prompt,
            "stream": false,
        });
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }
        body
    }
}

/// Extract the generated text from an `/api/generate` response
fn parse_generate_response(body: &Value) -> Result<String, AdapterError> {
    if let Some(err) = body.get("error").and_then(Value::as_str) {
        return Err(AdapterError::api(PROVIDER, err));
    }
    body.get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AdapterError::api(PROVIDER, "missing 'response' in generate reply"))
}

/// List model names from an `/api/tags` response
fn parse_model_names(body: &Value) -> Vec<String> {
    body.get("models")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Model for OllamaModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(
        &self,
        prompt: &str,
        config: Option<&GenerationConfig>,
    ) -> Result<String, AdapterError> {
        let body = self.generate_body(prompt, config);
        log::debug!("Ollama request body: {}", body);

        let resp = self
            .client
            .post(self.endpoint("api/generate"))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(AdapterError::api(PROVIDER, format!("{}: {}", status, text)));
        }

        let resp_json: Value = resp.json().await?;
        let text = parse_generate_response(&resp_json)?;
        log::info!(
            "Ollama {} returned {} characters",
            self.model_name,
            text.len()
        );
        Ok(text)
    }

    async fn check_ready(&self) -> Result<(), AdapterError> {
        log::info!("Checking Ollama connection at {}", self.base_url);

        let resp = self
            .client
            .get(self.endpoint("api/tags"))
            .timeout(READY_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AdapterError::api(
                PROVIDER,
                format!("tags endpoint returned {}", resp.status()),
            ));
        }

        let body: Value = resp.json().await?;
        let available = parse_model_names(&body);
        log::info!("Ollama is running with {} models", available.len());

        if available.iter().any(|m| m == &self.model_name) {
            Ok(())
        } else {
            Err(AdapterError::ModelUnavailable {
                model: self.model_name.clone(),
                available,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, routing::post, Json, Router};

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn model(base_url: &str) -> OllamaModel {
        OllamaModel::new(base_url, "gpt-oss:20b", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(OllamaModel::new("not a url", "m", Duration::from_secs(1)).is_err());
        assert!(OllamaModel::new("ftp://host", "m", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let m = model("http://localhost:11434/");
        assert_eq!(m.endpoint("api/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn test_generate_body_maps_options() {
        let m = model("http://localhost:11434");
        let config = GenerationConfig {
            temperature: Some(0.5),
            max_output_tokens: Some(256),
            ..Default::default()
        };
        let body = m.generate_body("hi", Some(&config));
        assert_eq!(body["model"], "gpt-oss:20b");
        assert_eq!(body["prompt"], "hi");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.5);
        assert_eq!(body["options"]["num_predict"], 256);
        assert!(body["options"].get("top_k").is_none());
    }

    #[test]
    fn test_generate_body_without_config_has_no_options() {
        let m = model("http://localhost:11434");
        let body = m.generate_body("hi", None);
        assert!(body.get("options").is_none());
    }

    #[test]
    fn test_parse_generate_response() {
        assert_eq!(
            parse_generate_response(&json!({"response": "hello"})).unwrap(),
            "hello"
        );
        assert!(parse_generate_response(&json!({"error": "model not found"})).is_err());
        assert!(parse_generate_response(&json!({})).is_err());
    }

    #[test]
    fn test_parse_model_names() {
        let body = json!({"models": [{"name": "llama3"}, {"name": "gpt-oss:20b"}]});
        assert_eq!(parse_model_names(&body), vec!["llama3", "gpt-oss:20b"]);
        assert!(parse_model_names(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_generate_against_server() {
        let app = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "response": format!("echo: {}", body["prompt"].as_str().unwrap()) }))
            }),
        );
        let base = spawn_server(app).await;

        let text = model(&base).generate("ping", None).await.unwrap();
        assert_eq!(text, "echo: ping");
    }

    #[tokio::test]
    async fn test_check_ready_model_present() {
        let app = Router::new().route(
            "/api/tags",
            get(|| async { Json(json!({"models": [{"name": "gpt-oss:20b"}]})) }),
        );
        let base = spawn_server(app).await;

        assert!(model(&base).check_ready().await.is_ok());
    }

    #[tokio::test]
    async fn test_check_ready_model_missing() {
        let app = Router::new().route(
            "/api/tags",
            get(|| async { Json(json!({"models": [{"name": "llama3"}]})) }),
        );
        let base = spawn_server(app).await;

        let err = model(&base).check_ready().await.unwrap_err();
        match err {
            AdapterError::ModelUnavailable { model, available } => {
                assert_eq!(model, "gpt-oss:20b");
                assert_eq!(available, vec!["llama3".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_check_ready_unreachable() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = model(&format!("http://{}", addr))
            .check_ready()
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Http(_)));
    }
}
