// SPDX-License-Identifier: MIT

//! HTTP front end: one-shot runs and SSE-streamed runs

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::RefineError;
use crate::refine::workflow::builder::{GraphBuilder, RunOptions};

type AppState = Arc<GraphBuilder>;

#[derive(Debug, Deserialize)]
struct RunRequest {
    input: String,
    #[serde(default)]
    max_iterations: Option<u32>,
    #[serde(default)]
    extended: Option<bool>,
}

impl RunRequest {
    fn options(&self) -> RunOptions {
        RunOptions {
            max_iterations: self.max_iterations,
            extended: self.extended,
        }
    }
}

pub fn router(builder: Arc<GraphBuilder>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/runs", post(create_run))
        .route("/api/runs/stream", post(stream_run))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(builder)
}

pub async fn serve(port: u16, builder: Arc<GraphBuilder>) -> Result<(), RefineError> {
    let app = router(builder);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn error_status(error: &RefineError) -> StatusCode {
    match error {
        RefineError::Precondition(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

type ApiError = (StatusCode, Json<Value>);

fn require_input(payload: &RunRequest) -> Result<(), ApiError> {
    if payload.input.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "input must not be empty" })),
        ));
    }
    Ok(())
}

async fn create_run(
    State(builder): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> (StatusCode, Json<Value>) {
    if let Err(rejection) = require_input(&payload) {
        return rejection;
    }

    match builder.run_with(&payload.input, &payload.options()).await {
        Ok(state) => (
            StatusCode::OK,
            Json(json!({ "status": "completed", "state": state.to_json() })),
        ),
        Err(e) => {
            log::error!("Run failed: {}", e);
            (error_status(&e), Json(json!({ "error": e.to_string() })))
        }
    }
}

async fn stream_run(
    State(builder): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require_input(&payload)?;
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        log::info!("Starting streamed run");
        if let Err(e) = builder
            .run_stream(&payload.input, &payload.options(), tx)
            .await
        {
            log::error!("Streamed run failed: {}", e);
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Ok(Event::default()
            .json_data(&event)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::AdapterError;
    use crate::adk::model::{GenerationConfig, Model};
    use crate::adk::tool::{Notifier, ReviewRequest, Reviewer, SearchOutput, SearchRequest, Searcher};
    use crate::refine::config::Settings;
    use crate::refine::workflow::builder::Adapters;
    use async_trait::async_trait;

    struct EchoModel {
        ready: bool,
    }

    #[async_trait]
    impl Model for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _config: Option<&GenerationConfig>,
        ) -> Result<String, AdapterError> {
            Ok("echo answer".to_string())
        }

        async fn check_ready(&self) -> Result<(), AdapterError> {
            if self.ready {
                Ok(())
            } else {
                Err(AdapterError::api("echo", "down"))
            }
        }
    }

    struct NoopTools;

    #[async_trait]
    impl Searcher for NoopTools {
        fn name(&self) -> &str {
            "noop"
        }

        async fn search(&self, _request: &SearchRequest) -> Result<SearchOutput, AdapterError> {
            Err(AdapterError::EmptyResponse("noop".to_string()))
        }
    }

    #[async_trait]
    impl Reviewer for NoopTools {
        fn name(&self) -> &str {
            "noop"
        }

        async fn review(&self, _request: &ReviewRequest) -> Result<String, AdapterError> {
            Err(AdapterError::EmptyResponse("noop".to_string()))
        }
    }

    #[async_trait]
    impl Notifier for NoopTools {
        fn name(&self) -> &str {
            "noop"
        }

        async fn notify(&self, _text: &str) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    async fn spawn_app(ready: bool) -> String {
        let adapters = Adapters {
            model: Arc::new(EchoModel { ready }),
            searcher: Arc::new(NoopTools),
            reviewer: Arc::new(NoopTools),
            notifier: None,
        };
        let builder = Arc::new(GraphBuilder::new(Settings::default(), adapters));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(builder)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_app(true).await;
        let body: Value = reqwest::get(format!("{}/api/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_run_returns_final_state() {
        let base = spawn_app(true).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/api/runs", base))
            .json(&json!({ "input": "Hello", "max_iterations": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "completed");
        assert_eq!(body["state"]["iteration"], 1);
        assert_eq!(body["state"]["processed_output"], "echo answer");
        assert_eq!(body["state"]["messages"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_create_run_rejects_empty_input() {
        let base = spawn_app(true).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/api/runs", base))
            .json(&json!({ "input": "  " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_run_model_down() {
        let base = spawn_app(false).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/api/runs", base))
            .json(&json!({ "input": "Hello" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Precondition"));
    }

    #[tokio::test]
    async fn test_stream_run_emits_events() {
        let base = spawn_app(true).await;
        let text = reqwest::Client::new()
            .post(format!("{}/api/runs/stream", base))
            .json(&json!({ "input": "Hello", "max_iterations": 0 }))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert!(text.contains("\"type\":\"run_started\""));
        assert!(text.contains("\"type\":\"node_started\""));
        assert!(text.contains("\"type\":\"run_completed\""));
    }

    #[tokio::test]
    async fn test_stream_run_rejects_empty_input() {
        let base = spawn_app(true).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/api/runs/stream", base))
            .json(&json!({ "input": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "input must not be empty");
    }
}
