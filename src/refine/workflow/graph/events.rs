// SPDX-License-Identifier: MIT

use super::types::NodeId;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Progress events emitted by [`Pipeline::run_stream`](super::Pipeline::run_stream)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        input: String,
    },
    NodeStarted {
        run_id: Uuid,
        node: NodeId,
        iteration: u32,
    },
    NodeCompleted {
        run_id: Uuid,
        node: NodeId,
        /// State fields the node's update touched
        fields: Vec<String>,
    },
    RunCompleted {
        run_id: Uuid,
        state: Value,
    },
    RunFailed {
        run_id: Uuid,
        error: String,
    },
}
