// SPDX-License-Identifier: MIT

//! Pipeline executor

use crate::adk::error::{GraphError, NodeError, RefineError};
use crate::refine::workflow::nodes::Node;
use crate::refine::workflow::state::PipelineState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::PipelineEvent;
use super::router::Router;
use super::types::{Edge, NodeId, Topology};

/// Fixed-topology pipeline executor
///
/// Owns the dispatch table from node identity to implementation. Each call
/// to [`run`](Self::run) creates a fresh state, so one `Pipeline` can serve
/// any number of independent runs.
pub struct Pipeline {
    topology: Topology,
    router: Router,
    max_iterations: u32,
    nodes: HashMap<NodeId, Arc<dyn Node>>,
}

impl Pipeline {
    /// Create a new Pipeline
    ///
    /// Fails unless `nodes` holds exactly one implementation for every node
    /// of `topology` and nothing else.
    pub fn new(
        topology: Topology,
        max_iterations: u32,
        nodes: Vec<Arc<dyn Node>>,
    ) -> Result<Self, GraphError> {
        let mut table: HashMap<NodeId, Arc<dyn Node>> = HashMap::new();

        for node in nodes {
            let id = node.id();
            if id == NodeId::End || !topology.contains(id) {
                return Err(GraphError::UnexpectedNode(
                    id.to_string(),
                    topology.to_string(),
                ));
            }
            if table.insert(id, node).is_some() {
                return Err(GraphError::DuplicateNode(id.to_string()));
            }
        }

        if let Some(missing) = topology.nodes().into_iter().find(|id| !table.contains_key(id)) {
            return Err(GraphError::MissingNode(missing.to_string()));
        }

        Ok(Self {
            topology,
            router: Router::new(topology),
            max_iterations,
            nodes: table,
        })
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run the pipeline to completion and return the final state
    pub async fn run(&self, user_input: &str) -> Result<PipelineState, RefineError> {
        self.execute(user_input, None).await
    }

    /// Run the pipeline, emitting progress events on `tx`
    pub async fn run_stream(
        &self,
        user_input: &str,
        tx: mpsc::Sender<PipelineEvent>,
    ) -> Result<PipelineState, RefineError> {
        self.execute(user_input, Some(&tx)).await
    }

    async fn execute(
        &self,
        user_input: &str,
        tx: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> Result<PipelineState, RefineError> {
        let run_id = Uuid::new_v4();
        log::info!(
            "[{}] Starting {} pipeline (max_iterations={})",
            run_id,
            self.topology,
            self.max_iterations
        );
        emit(
            tx,
            PipelineEvent::RunStarted {
                run_id,
                input: user_input.to_string(),
            },
        )
        .await;

        match self.drive(run_id, user_input, tx).await {
            Ok(state) => {
                log::info!(
                    "[{}] Pipeline completed after {} iterations with {} messages",
                    run_id,
                    state.iteration(),
                    state.message_count()
                );
                emit(
                    tx,
                    PipelineEvent::RunCompleted {
                        run_id,
                        state: state.to_json(),
                    },
                )
                .await;
                Ok(state)
            }
            Err(e) => {
                log::error!("[{}] Pipeline aborted: {}", run_id, e);
                emit(
                    tx,
                    PipelineEvent::RunFailed {
                        run_id,
                        error: e.to_string(),
                    },
                )
                .await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        run_id: Uuid,
        user_input: &str,
        tx: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> Result<PipelineState, RefineError> {
        let mut state = PipelineState::with_input(user_input);
        let mut current = self.topology.entry();
        // Nodes already run since the last pass through Continuation
        let mut visited: HashSet<NodeId> = HashSet::new();

        while current != NodeId::End {
            if !visited.insert(current) {
                return Err(RefineError::executor(
                    current.as_str(),
                    NodeError::Invariant(format!(
                        "node invoked twice in iteration {}",
                        state.iteration()
                    )),
                ));
            }

            if current == NodeId::Continuation && state.iteration() >= self.max_iterations {
                return Err(RefineError::executor(
                    current.as_str(),
                    NodeError::Invariant(format!(
                        "loop requested at iteration {} but max_iterations is {}",
                        state.iteration(),
                        self.max_iterations
                    )),
                ));
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::MissingNode(current.to_string()))?;

            log::info!(
                "[{}] Executing node: {} (iteration {})",
                run_id,
                current,
                state.iteration()
            );
            emit(
                tx,
                PipelineEvent::NodeStarted {
                    run_id,
                    node: current,
                    iteration: state.iteration(),
                },
            )
            .await;

            let iteration_before = state.iteration();
            let update = node
                .run(&state)
                .await
                .map_err(|e| RefineError::executor(current.as_str(), e))?;
            let touched = update.field_names();
            state
                .apply(update)
                .map_err(|e| RefineError::executor(current.as_str(), e))?;

            // Only Continuation may move the counter, and by exactly one
            let expected = match current {
                NodeId::Continuation => iteration_before + 1,
                _ => iteration_before,
            };
            if state.iteration() != expected {
                return Err(RefineError::executor(
                    current.as_str(),
                    NodeError::Invariant(format!(
                        "iteration moved from {} to {}",
                        iteration_before,
                        state.iteration()
                    )),
                ));
            }

            log::debug!("[{}] Node {} updated {:?}", run_id, current, touched);
            emit(
                tx,
                PipelineEvent::NodeCompleted {
                    run_id,
                    node: current,
                    fields: touched,
                },
            )
            .await;

            let next = match self.topology.next(current) {
                Some(Edge::Static(next)) => next,
                Some(Edge::Routed) => self.router.route(&state),
                None => NodeId::End,
            };

            if current == NodeId::Continuation {
                visited.clear();
            }
            current = next;
        }

        Ok(state)
    }
}

async fn emit(tx: Option<&mpsc::Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::workflow::state::{fields, Message, StateUpdate};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type UpdateFn = fn(&PipelineState) -> Result<StateUpdate, NodeError>;

    // Mock node - computes its update with a plain function and counts calls
    struct MockNode {
        id: NodeId,
        update: UpdateFn,
        calls: AtomicUsize,
    }

    impl MockNode {
        fn new(id: NodeId, update: UpdateFn) -> Arc<Self> {
            Arc::new(Self {
                id,
                update,
                calls: AtomicUsize::new(0),
            })
        }

        fn noop(id: NodeId) -> Arc<Self> {
            Self::new(id, |_| Ok(StateUpdate::new()))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Node for MockNode {
        fn id(&self) -> NodeId {
            self.id
        }

        async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.update)(state)
        }
    }

    // Mock node that records the order in which nodes ran
    struct TracingNode {
        id: NodeId,
        trace: Arc<Mutex<Vec<NodeId>>>,
        inner: Arc<MockNode>,
    }

    #[async_trait]
    impl Node for TracingNode {
        fn id(&self) -> NodeId {
            self.id
        }

        async fn run(&self, state: &PipelineState) -> Result<StateUpdate, NodeError> {
            self.trace.lock().unwrap().push(self.id);
            self.inner.run(state).await
        }
    }

    fn input() -> Arc<MockNode> {
        MockNode::new(NodeId::Input, |s| {
            Ok(StateUpdate::new().push_message(Message::user(s.user_input())))
        })
    }

    fn decision_max_2() -> Arc<MockNode> {
        MockNode::new(NodeId::Decision, |s| {
            Ok(StateUpdate::new()
                .set(fields::SHOULD_CONTINUE, s.iteration() < 2)
                .push_message(Message::assistant(s.processed_output())))
        })
    }

    fn continuation() -> Arc<MockNode> {
        MockNode::new(NodeId::Continuation, |s| {
            Ok(StateUpdate::new().set(fields::ITERATION, s.iteration() + 1))
        })
    }

    fn basic_nodes() -> Vec<Arc<dyn Node>> {
        vec![
            input(),
            MockNode::noop(NodeId::Processing),
            decision_max_2(),
            continuation(),
        ]
    }

    #[test]
    fn test_rejects_missing_node() {
        let nodes: Vec<Arc<dyn Node>> = vec![
            input(),
            MockNode::noop(NodeId::Processing),
            decision_max_2(),
        ];
        let err = Pipeline::new(Topology::Basic, 2, nodes).err().unwrap();
        assert_eq!(err, GraphError::MissingNode("continuation".to_string()));
    }

    #[test]
    fn test_rejects_node_outside_topology() {
        let mut nodes = basic_nodes();
        nodes.push(MockNode::noop(NodeId::Review));
        let err = Pipeline::new(Topology::Basic, 2, nodes).err().unwrap();
        assert_eq!(
            err,
            GraphError::UnexpectedNode("review".to_string(), "basic".to_string())
        );
    }

    #[test]
    fn test_rejects_duplicate_node() {
        let mut nodes = basic_nodes();
        nodes.push(MockNode::noop(NodeId::Processing));
        let err = Pipeline::new(Topology::Basic, 2, nodes).err().unwrap();
        assert_eq!(err, GraphError::DuplicateNode("processing".to_string()));
    }

    #[tokio::test]
    async fn test_basic_loop_runs_to_bound() {
        let processing = MockNode::noop(NodeId::Processing);
        let cont = continuation();
        let nodes: Vec<Arc<dyn Node>> =
            vec![input(), processing.clone(), decision_max_2(), cont.clone()];
        let pipeline = Pipeline::new(Topology::Basic, 2, nodes).unwrap();

        let state = pipeline.run("Hello").await.unwrap();

        assert_eq!(state.iteration(), 2);
        assert_eq!(processing.calls(), 3);
        assert_eq!(cont.calls(), 2);
        assert_eq!(state.message_count(), 6);
        assert!(!state.should_continue());
    }

    #[tokio::test]
    async fn test_nodes_run_in_edge_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let wrap = |inner: Arc<MockNode>| -> Arc<dyn Node> {
            Arc::new(TracingNode {
                id: inner.id,
                trace: trace.clone(),
                inner,
            })
        };
        let nodes = vec![
            wrap(input()),
            wrap(MockNode::noop(NodeId::Search)),
            wrap(MockNode::noop(NodeId::Processing)),
            wrap(MockNode::new(NodeId::Decision, |_| {
                Ok(StateUpdate::new().set(fields::SHOULD_CONTINUE, false))
            })),
            wrap(continuation()),
            wrap(MockNode::noop(NodeId::Review)),
            wrap(MockNode::noop(NodeId::Documentation)),
        ];
        let pipeline = Pipeline::new(Topology::Extended { notify: false }, 3, nodes).unwrap();

        pipeline.run("q").await.unwrap();

        use NodeId::*;
        assert_eq!(
            *trace.lock().unwrap(),
            vec![Input, Search, Processing, Decision, Review, Documentation]
        );
    }

    #[tokio::test]
    async fn test_node_error_aborts_run() {
        let documentation = MockNode::noop(NodeId::Documentation);
        let nodes: Vec<Arc<dyn Node>> = vec![
            input(),
            MockNode::noop(NodeId::Search),
            MockNode::new(NodeId::Processing, |_| {
                Err(NodeError::Invariant("model exploded".to_string()))
            }),
            decision_max_2(),
            continuation(),
            MockNode::noop(NodeId::Review),
            documentation.clone(),
        ];
        let pipeline = Pipeline::new(Topology::Extended { notify: false }, 2, nodes).unwrap();

        let err = pipeline.run("q").await.unwrap_err();
        match err {
            RefineError::Executor { node, .. } => assert_eq!(node, "processing"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(documentation.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_update_aborts_run() {
        let nodes: Vec<Arc<dyn Node>> = vec![
            input(),
            MockNode::new(NodeId::Processing, |_| {
                Ok(StateUpdate::new().set("not_a_field", "x"))
            }),
            decision_max_2(),
            continuation(),
        ];
        let pipeline = Pipeline::new(Topology::Basic, 2, nodes).unwrap();

        let err = pipeline.run("q").await.unwrap_err();
        assert!(matches!(
            err,
            RefineError::Executor {
                source: NodeError::State(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_runaway_decision_is_stopped() {
        let nodes: Vec<Arc<dyn Node>> = vec![
            input(),
            MockNode::noop(NodeId::Processing),
            MockNode::new(NodeId::Decision, |_| {
                Ok(StateUpdate::new().set(fields::SHOULD_CONTINUE, true))
            }),
            continuation(),
        ];
        let pipeline = Pipeline::new(Topology::Basic, 3, nodes).unwrap();

        let err = pipeline.run("q").await.unwrap_err();
        assert!(err.to_string().contains("max_iterations is 3"));
    }

    #[tokio::test]
    async fn test_continuation_must_advance_iteration() {
        let nodes: Vec<Arc<dyn Node>> = vec![
            input(),
            MockNode::noop(NodeId::Processing),
            decision_max_2(),
            MockNode::noop(NodeId::Continuation),
        ];
        let pipeline = Pipeline::new(Topology::Basic, 2, nodes).unwrap();

        let err = pipeline.run("q").await.unwrap_err();
        assert!(err.to_string().contains("iteration moved from 0 to 0"));
    }

    #[tokio::test]
    async fn test_only_continuation_moves_iteration() {
        let nodes: Vec<Arc<dyn Node>> = vec![
            input(),
            MockNode::new(NodeId::Processing, |s| {
                Ok(StateUpdate::new().set(fields::ITERATION, s.iteration() + 5))
            }),
            decision_max_2(),
            continuation(),
        ];
        let pipeline = Pipeline::new(Topology::Basic, 2, nodes).unwrap();

        let err = pipeline.run("q").await.unwrap_err();
        match err {
            RefineError::Executor { node, .. } => assert_eq!(node, "processing"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_stream_emits_events() {
        let nodes: Vec<Arc<dyn Node>> = vec![
            input(),
            MockNode::noop(NodeId::Processing),
            MockNode::new(NodeId::Decision, |_| {
                Ok(StateUpdate::new().set(fields::SHOULD_CONTINUE, false))
            }),
            continuation(),
        ];
        let pipeline = Pipeline::new(Topology::Basic, 0, nodes).unwrap();
        let (tx, mut rx) = mpsc::channel(64);

        let state = pipeline.run_stream("q", tx).await.unwrap();
        assert_eq!(state.iteration(), 0);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(PipelineEvent::RunStarted { .. })));
        assert!(matches!(events.last(), Some(PipelineEvent::RunCompleted { .. })));
        let started: Vec<NodeId> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::NodeStarted { node, .. } => Some(*node),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![NodeId::Input, NodeId::Processing, NodeId::Decision]
        );
    }

    #[tokio::test]
    async fn test_independent_runs_do_not_share_state() {
        let pipeline = Pipeline::new(Topology::Basic, 2, basic_nodes()).unwrap();

        let first = pipeline.run("first").await.unwrap();
        let second = pipeline.run("second").await.unwrap();

        assert_eq!(first.message_count(), second.message_count());
        assert_eq!(second.messages()[0], Message::user("second"));
    }
}
