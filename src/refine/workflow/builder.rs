// SPDX-License-Identifier: MIT

//! Graph builder - wires settings and adapters into an executable pipeline

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::adk::error::{ConfigError, GraphError, RefineError};
use crate::adk::model::ollama::OllamaModel;
use crate::adk::model::Model;
use crate::adk::tool::{Notifier, Reviewer, Searcher};
use crate::refine::config::Settings;
use crate::refine::tools::{CommandReviewer, PsearchTool, SlackNotifier};
use crate::refine::workflow::graph::{Pipeline, PipelineEvent, Topology};
use crate::refine::workflow::nodes::{
    ContinuationNode, DecisionNode, DocumentationNode, InputNode, Node, NotificationNode,
    ProcessingNode, ReviewNode, SearchNode,
};
use crate::refine::workflow::state::PipelineState;

/// External collaborators shared by every run
#[derive(Clone)]
pub struct Adapters {
    pub model: Arc<dyn Model>,
    pub searcher: Arc<dyn Searcher>,
    pub reviewer: Arc<dyn Reviewer>,
    /// Only present when a webhook is configured
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl Adapters {
    /// The production adapters described by `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let model = OllamaModel::new(
            &settings.model.base_url,
            settings.model.name.clone(),
            Duration::from_secs(settings.model.request_timeout_secs),
        )?;
        let searcher = PsearchTool::new(
            settings.search.program.clone(),
            Duration::from_secs(settings.search.timeout_secs),
            settings.search.result_limit,
        );
        let reviewer = CommandReviewer::new(
            settings.review.command.clone(),
            settings.review.args.clone(),
            Duration::from_secs(settings.review.timeout_secs),
        );
        let notifier = match &settings.notification.slack_webhook_url {
            Some(url) => Some(Arc::new(SlackNotifier::new(url)?) as Arc<dyn Notifier>),
            None => None,
        };

        Ok(Self {
            model: Arc::new(model),
            searcher: Arc::new(searcher),
            reviewer: Arc::new(reviewer),
            notifier,
        })
    }
}

/// Per-run overrides of the configured workflow settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub max_iterations: Option<u32>,
    pub extended: Option<bool>,
}

/// High-level builder for constructing and running pipelines
pub struct GraphBuilder {
    settings: Settings,
    adapters: Adapters,
}

impl GraphBuilder {
    pub fn new(settings: Settings, adapters: Adapters) -> Self {
        Self { settings, adapters }
    }

    /// Builder with the production adapters for `settings`
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let adapters = Adapters::from_settings(&settings)?;
        Ok(Self::new(settings, adapters))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Graph shape for a run with `options`
    pub fn topology(&self, options: &RunOptions) -> Topology {
        if options.extended.unwrap_or(self.settings.workflow.extended) {
            Topology::Extended {
                notify: self.adapters.notifier.is_some(),
            }
        } else {
            Topology::Basic
        }
    }

    pub fn build(&self) -> Result<Pipeline, GraphError> {
        self.build_with(&RunOptions::default())
    }

    /// Assemble a pipeline, applying `options` over the configured settings
    pub fn build_with(&self, options: &RunOptions) -> Result<Pipeline, GraphError> {
        let topology = self.topology(options);
        let max_iterations = options
            .max_iterations
            .unwrap_or(self.settings.workflow.max_iterations);

        let processing = ProcessingNode::new(
            self.adapters.model.clone(),
            self.settings.model.generation_config(),
        )
        .with_fallback(self.settings.model.fallback_on_error);

        let mut nodes: Vec<Arc<dyn Node>> = vec![
            Arc::new(InputNode::new()),
            Arc::new(processing),
            Arc::new(DecisionNode::new(max_iterations)),
            Arc::new(ContinuationNode::new()),
        ];

        if let Topology::Extended { notify } = topology {
            nodes.push(Arc::new(SearchNode::new(self.adapters.searcher.clone())));
            nodes.push(Arc::new(ReviewNode::new(self.adapters.reviewer.clone())));
            nodes.push(Arc::new(DocumentationNode::new(
                self.settings.documentation.dir.clone(),
            )));
            if let (true, Some(notifier)) = (notify, &self.adapters.notifier) {
                nodes.push(Arc::new(NotificationNode::new(notifier.clone())));
            }
        }

        log::info!(
            "Building {} pipeline (max iterations: {}, nodes: {})",
            topology,
            max_iterations,
            nodes.len()
        );
        Pipeline::new(topology, max_iterations, nodes)
    }

    /// Verify the model endpoint serves the configured model
    pub async fn check_ready(&self) -> Result<(), RefineError> {
        self.adapters.model.check_ready().await.map_err(|e| {
            log::error!("Model {} is not ready: {}", self.adapters.model.name(), e);
            RefineError::precondition(format!(
                "model '{}' is not ready: {}",
                self.adapters.model.name(),
                e
            ))
        })
    }

    pub async fn run(&self, input: &str) -> Result<PipelineState, RefineError> {
        self.run_with(input, &RunOptions::default()).await
    }

    /// Readiness check, then a full pipeline run
    pub async fn run_with(
        &self,
        input: &str,
        options: &RunOptions,
    ) -> Result<PipelineState, RefineError> {
        self.check_ready().await?;
        self.build_with(options)?.run(input).await
    }

    /// Like [`run_with`](Self::run_with), streaming progress events to `tx`
    pub async fn run_stream(
        &self,
        input: &str,
        options: &RunOptions,
        tx: mpsc::Sender<PipelineEvent>,
    ) -> Result<PipelineState, RefineError> {
        let prepared = match self.check_ready().await {
            Ok(()) => self.build_with(options).map_err(RefineError::from),
            Err(e) => Err(e),
        };

        match prepared {
            Ok(pipeline) => pipeline.run_stream(input, tx).await,
            Err(e) => {
                // the executor never started, so report the failure here
                let _ = tx
                    .send(PipelineEvent::RunFailed {
                        run_id: Uuid::new_v4(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }
}
