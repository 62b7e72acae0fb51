use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::instrument;

use crate::event_bus::{Event, EventBus, STREAM_END_SCOPE};
use crate::executor::{ExecutionContext, ExecutionSnapshot, ExecutorError};
use crate::node::{NodeData, NodeDataPatch, TextPatch};
use crate::reachability;
use crate::registry::CapabilityRegistry;
use crate::runtimes::progress::{ProgressSnapshot, ProgressTracker};
use crate::runtimes::runtime_config::RuntimeConfig;
use crate::sources::{self, Eligibility};
use crate::store::{GraphStore, GraphStoreError};
use crate::utils::id_generator::IdGenerator;

/// Outcome of one completed cascade run.
///
/// Nodes appear in `executed_nodes` in the order they went through their own
/// execution step. `skipped_nodes` records skip observations in traversal
/// order; one node can appear more than once when several edges lead into it.
#[derive(Debug, Clone)]
pub struct CascadeReport {
    pub session_id: String,
    pub start_node_id: String,
    /// Number of nodes that went through their own execution step.
    pub steps: u64,
    pub executed_nodes: Vec<String>,
    pub skipped_nodes: Vec<SkippedNode>,
}

/// A node the cascade looked at but did not execute, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNode {
    pub node_id: String,
    pub reason: Eligibility,
}

enum StreamEndReason {
    Completed { steps: u64 },
    Error { step: Option<u64>, error: String },
}

/// One pending action of the depth-first traversal.
///
/// The recursive visit/propagate/cleanup shape is flattened onto an explicit
/// stack so a deep canvas cannot overflow the call stack and the failure path
/// can drain pending cleanups in one place.
enum Frame {
    /// Run the full per-node step for this node.
    Visit { node_id: String },
    /// Resume walking a node's outgoing edges at the given position.
    Propagate { node_id: String, edge_cursor: usize },
    /// Cleanup on the way back out of an executed node.
    Finish { node_id: String },
}

/// Mutable state of one cascade run.
struct CascadeState {
    start_node_id: String,
    visited: FxHashSet<String>,
    stack: Vec<Frame>,
    executed_nodes: Vec<String>,
    skipped_nodes: Vec<SkippedNode>,
    step: u64,
}

impl CascadeState {
    fn new(start_node_id: &str) -> Self {
        Self {
            start_node_id: start_node_id.to_string(),
            visited: FxHashSet::default(),
            stack: vec![Frame::Visit {
                node_id: start_node_id.to_string(),
            }],
            executed_nodes: Vec::new(),
            skipped_nodes: Vec::new(),
            step: 0,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("run context missing: configuration carries no session id")]
    #[diagnostic(
        code(canvasflow::runner::missing_run_context),
        help("Build the runner from a RuntimeConfig with a session id, or keep the default config which generates one.")
    )]
    MissingRunContext,

    #[error(transparent)]
    #[diagnostic(code(canvasflow::runner::store))]
    Store(#[from] GraphStoreError),

    #[error("executor for node `{node_id}` failed at step {step}")]
    #[diagnostic(code(canvasflow::runner::executor))]
    Executor {
        node_id: String,
        step: u64,
        #[source]
        source: ExecutorError,
    },
}

/// Runtime execution engine for canvas cascades.
///
/// `CascadeRunner` owns everything a run needs besides the graph itself:
/// - **Graph access**: a shared [`GraphStore`] handle, re-read at every step
/// - **Capabilities**: the [`CapabilityRegistry`] mapping nodes to executors
/// - **Event streaming**: an [`EventBus`] with pluggable sinks
/// - **Progress**: the run-wide executing signal behind canvas badges
///
/// # Architecture: store vs runner
///
/// - **[`GraphStore`]**: the canvas itself (nodes, edges, payloads)
/// - **`CascadeRunner`**: the runtime environment (eligibility, dispatch,
///   propagation, progress)
///
/// The store outlives any runner and several runners can share one store;
/// each runner carries its own registry, event bus, and progress signal, so
/// per-request isolation in a web server is one constructor call.
///
/// # Execution model
///
/// [`run`](Self::run) walks the graph depth-first from a start node, in store
/// edge order, executing each eligible node at most once per run. A node that
/// is locked, already running, or has no edges at all is skipped with a
/// logged reason; a skip is a normal outcome, not an error. Executor failures
/// abort the run, and the runner clears every raised running marker on the
/// way out.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use canvasflow::node::{CanvasEdge, CanvasNode};
/// use canvasflow::registry::CapabilityRegistry;
/// use canvasflow::runtimes::CascadeRunner;
/// use canvasflow::store::InMemoryGraphStore;
///
/// # async fn demo() -> miette::Result<()> {
/// let store = Arc::new(
///     InMemoryGraphStore::new()
///         .with_node(CanvasNode::text("draft", "Launch day"))
///         .with_node(CanvasNode::speech("voiceover", ""))
///         .with_edge(CanvasEdge::between("draft", "voiceover")),
/// );
///
/// let mut runner = CascadeRunner::new(store, CapabilityRegistry::new());
/// let report = runner.run("draft").await?;
/// assert_eq!(report.executed_nodes, vec!["draft", "voiceover"]);
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`with_config_and_bus()`](Self::with_config_and_bus) - custom event sinks
/// - [`ChannelSink::pair`](crate::event_bus::ChannelSink::pair) - live event streams
pub struct CascadeRunner {
    store: Arc<dyn GraphStore>,
    registry: CapabilityRegistry,
    config: RuntimeConfig,
    event_bus: EventBus,
    event_sender: flume::Sender<Event>,
    progress: ProgressTracker,
}

impl CascadeRunner {
    /// Create a runner with the default configuration: a generated session
    /// id, the environment-resolved settle delay, and a stdout event sink.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>, registry: CapabilityRegistry) -> Self {
        Self::with_config(store, registry, RuntimeConfig::default())
    }

    /// Create a runner with an explicit configuration. The event bus is built
    /// from the configuration's sink list and its listener starts right away.
    #[must_use]
    pub fn with_config(
        store: Arc<dyn GraphStore>,
        registry: CapabilityRegistry,
        config: RuntimeConfig,
    ) -> Self {
        let event_bus = config.event_bus.build_event_bus();
        Self::with_config_and_bus(store, registry, config, event_bus, true)
    }

    /// Create a runner with a custom [`EventBus`] for advanced event handling.
    ///
    /// Use this when events should reach custom sinks: a
    /// [`ChannelSink`](crate::event_bus::ChannelSink) streaming to a web
    /// client, a [`MemorySink`](crate::event_bus::MemorySink) capturing a test
    /// run, or both alongside stdout. Pass `start_listener = false` when the
    /// caller wants to attach more sinks before any event flows.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use futures_util::{StreamExt, pin_mut};
    /// use canvasflow::event_bus::{ChannelSink, EventBus};
    /// use canvasflow::registry::CapabilityRegistry;
    /// use canvasflow::runtimes::{CascadeRunner, RuntimeConfig};
    /// use canvasflow::store::InMemoryGraphStore;
    ///
    /// # async fn demo() -> miette::Result<()> {
    /// let (sink, events) = ChannelSink::pair();
    /// let bus = EventBus::with_sink(sink);
    ///
    /// let mut runner = CascadeRunner::with_config_and_bus(
    ///     Arc::new(InMemoryGraphStore::new()),
    ///     CapabilityRegistry::new(),
    ///     RuntimeConfig::default(),
    ///     bus,
    ///     true,
    /// );
    ///
    /// tokio::spawn(async move {
    ///     pin_mut!(events);
    ///     while let Some(event) = events.next().await {
    ///         println!("{event}");
    ///     }
    /// });
    ///
    /// runner.run("draft").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn with_config_and_bus(
        store: Arc<dyn GraphStore>,
        registry: CapabilityRegistry,
        config: RuntimeConfig,
        event_bus: EventBus,
        start_listener: bool,
    ) -> Self {
        if start_listener {
            event_bus.listen_for_events();
        }
        let event_sender = event_bus.get_sender();
        let progress = ProgressTracker::new(config.session_id.clone(), event_sender.clone());
        Self {
            store,
            registry,
            config,
            event_bus,
            event_sender,
            progress,
        }
    }

    /// Current value of the run-wide progress signal.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Mutable registry access, for swapping executors between runs.
    pub fn registry_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Execute a cascade from `start_node_id` until every reachable eligible
    /// node has been attempted.
    ///
    /// The traversal is depth-first in store edge order: each outgoing branch
    /// of a node runs to completion before the next branch starts. A run-local
    /// visited set makes execution at-most-once per node, including across
    /// cycles and diamond joins; whichever edge reaches a node first wins, and
    /// later arrivals are no-ops. Along text-to-text edges the source's text
    /// is copied into the target before the target runs.
    ///
    /// A missing start node is not an error: the run completes with an empty
    /// report, mirroring how a skip of any other node is handled.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::MissingRunContext`] when the configuration has no
    ///   session id.
    /// - [`RunnerError::Store`] when the graph store fails an operation.
    /// - [`RunnerError::Executor`] when a node's executor fails; the cascade
    ///   aborts, running markers are cleared on the way out, and the progress
    ///   signal returns to idle.
    #[instrument(skip(self), err)]
    pub async fn run(&mut self, start_node_id: &str) -> Result<CascadeReport, RunnerError> {
        let session_id = self
            .config
            .session_id
            .clone()
            .ok_or(RunnerError::MissingRunContext)?;
        let run_id = IdGenerator::new().generate_run_id();

        tracing::info!(session = %session_id, run = %run_id, start_node_id, "cascade run started");

        let nodes = self.store.get_nodes().await?;
        let edges = self.store.get_edges().await?;
        if !nodes.iter().any(|node| node.id == start_node_id) {
            tracing::warn!(start_node_id, "start node not found; nothing to run");
        }
        let total = reachability::count_reachable(start_node_id, &nodes, &edges);
        self.progress.begin(total);

        let mut run = CascadeState::new(start_node_id);
        let outcome = self.cascade_loop(&mut run).await;

        // Outermost exit: the executing flag never survives the run,
        // whatever happened inside.
        match outcome {
            Ok(()) => {
                self.progress.clear_executing();
                self.finalize_event_stream(
                    &session_id,
                    StreamEndReason::Completed { steps: run.step },
                );
                tracing::info!(
                    session = %session_id,
                    run = %run_id,
                    steps = run.step,
                    executed = run.executed_nodes.len(),
                    skipped = run.skipped_nodes.len(),
                    "cascade run completed"
                );
                Ok(CascadeReport {
                    session_id,
                    start_node_id: start_node_id.to_string(),
                    steps: run.step,
                    executed_nodes: run.executed_nodes,
                    skipped_nodes: run.skipped_nodes,
                })
            }
            Err(error) => {
                self.unwind(&mut run).await;
                self.progress.reset();
                self.finalize_event_stream(
                    &session_id,
                    StreamEndReason::Error {
                        step: (run.step > 0).then_some(run.step),
                        error: error.to_string(),
                    },
                );
                Err(error)
            }
        }
    }

    /// Drive the frame stack until it drains.
    async fn cascade_loop(&mut self, run: &mut CascadeState) -> Result<(), RunnerError> {
        while let Some(frame) = run.stack.pop() {
            match frame {
                Frame::Visit { node_id } => self.visit_node(run, &node_id).await?,
                Frame::Propagate {
                    node_id,
                    edge_cursor,
                } => self.propagate(run, &node_id, edge_cursor).await?,
                Frame::Finish { node_id } => self.finish_node(run, &node_id).await,
            }
        }
        Ok(())
    }

    /// One per-node step: visited guard, eligibility, dispatch, and the
    /// scheduling of propagation and cleanup.
    #[instrument(skip(self, run), err)]
    async fn visit_node(&mut self, run: &mut CascadeState, node_id: &str) -> Result<(), RunnerError> {
        // First arrival wins; later arrivals along other edges are no-ops.
        if !run.visited.insert(node_id.to_string()) {
            tracing::debug!(node_id, "already visited in this run");
            return Ok(());
        }

        let nodes = self.store.get_nodes().await?;
        let edges = self.store.get_edges().await?;
        let Some(node) = nodes.iter().find(|n| n.id == node_id) else {
            tracing::debug!(node_id, "node vanished before its step");
            return Ok(());
        };

        let eligibility = Eligibility::assess(node, &edges);
        if let Some(reason) = eligibility.skip_reason() {
            tracing::debug!(node_id, reason, "node not eligible, skipping");
            self.emit_node_event(node_id, run.step, "skip", format!("skipped: {reason}"));
            run.skipped_nodes.push(SkippedNode {
                node_id: node_id.to_string(),
                reason: eligibility,
            });
            return Ok(());
        }

        self.store.set_running(node_id, true).await?;
        // Cleanup is owed from this point on, success or failure.
        run.stack.push(Frame::Finish {
            node_id: node_id.to_string(),
        });

        // The graph may have changed since the run began (locks toggled,
        // subtrees attached): re-arm the executing flag in case an earlier
        // cleanup finalized against a shrunken reachable set, and keep the
        // denominator honest.
        self.progress.mark_executing();
        self.progress
            .set_total(reachability::count_reachable(&run.start_node_id, &nodes, &edges));

        run.step += 1;
        let step = run.step;
        let dispatch_span = tracing::info_span!("dispatch", node_id, step);
        dispatch_span
            .in_scope(|| self.dispatch_node(node_id, step))
            .await?;

        self.progress.record_executed();
        run.executed_nodes.push(node_id.to_string());

        run.stack.push(Frame::Propagate {
            node_id: node_id.to_string(),
            edge_cursor: 0,
        });
        Ok(())
    }

    /// Execute one node: wait out the settle delay, snapshot the node and its
    /// direct sources, and dispatch to the registered executor if any.
    ///
    /// A node without a registered executor is carried through unchanged;
    /// comment nodes, say, are intentionally non-executable.
    async fn dispatch_node(&self, node_id: &str, step: u64) -> Result<(), RunnerError> {
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let nodes = self.store.get_nodes().await?;
        let edges = self.store.get_edges().await?;
        let Some(node) = nodes.iter().find(|n| n.id == node_id) else {
            tracing::debug!(node_id, "node vanished during settle delay");
            return Ok(());
        };

        let Some(executor) = self.registry.executor_for(node_id, node.kind()) else {
            tracing::debug!(node_id, kind = %node.kind(), "no executor registered, carrying through");
            self.emit_node_event(
                node_id,
                step,
                "dispatch",
                "no executor registered, carried through".to_string(),
            );
            return Ok(());
        };

        self.emit_node_event(
            node_id,
            step,
            "dispatch",
            format!("executing {} node", node.kind()),
        );

        let snapshot =
            ExecutionSnapshot::new(node.clone(), sources::direct_sources(node_id, &nodes, &edges));
        let ctx = ExecutionContext {
            node_id: node_id.to_string(),
            step,
            event_bus_sender: self.event_sender.clone(),
        };

        match executor.execute(snapshot, ctx).await {
            Ok(Some(patch)) => self.apply_patch(node_id, patch).await,
            Ok(None) => Ok(()),
            Err(source) => {
                self.emit_node_event(node_id, step, "error", format!("executor failed: {source}"));
                Err(RunnerError::Executor {
                    node_id: node_id.to_string(),
                    step,
                    source,
                })
            }
        }
    }

    /// Walk a node's outgoing edges from `edge_cursor`, descending into the
    /// first actionable target and parking the rest behind its subtree.
    async fn propagate(
        &mut self,
        run: &mut CascadeState,
        node_id: &str,
        edge_cursor: usize,
    ) -> Result<(), RunnerError> {
        let nodes = self.store.get_nodes().await?;
        let edges = self.store.get_edges().await?;
        let source = nodes.iter().find(|n| n.id == node_id);

        let outgoing = sources::outgoing_edges(node_id, &edges);
        for (offset, edge) in outgoing.iter().enumerate().skip(edge_cursor) {
            let Some(target) = nodes.iter().find(|n| n.id == edge.target) else {
                tracing::debug!(edge_id = %edge.id, target = %edge.target, "edge target vanished, skipping");
                continue;
            };

            let eligibility = Eligibility::assess(target, &edges);
            if let Some(reason) = eligibility.skip_reason() {
                tracing::debug!(target = %target.id, reason, "target not eligible, skipping edge");
                self.emit_node_event(&target.id, run.step, "skip", format!("skipped: {reason}"));
                run.skipped_nodes.push(SkippedNode {
                    node_id: target.id.clone(),
                    reason: eligibility,
                });
                continue;
            }

            // Text-to-text edges copy content forward before the target
            // runs: pure data propagation, no generation. A target that
            // already ran still receives the copy; only the descent below
            // is guarded by the visited set.
            if let Some(source) = source
                && let NodeData::Text(source_data) = &source.data
                && target.kind().supports_passthrough()
            {
                self.apply_patch(
                    &target.id,
                    NodeDataPatch::Text(TextPatch::content(source_data.text.clone())),
                )
                .await?;
                self.emit_node_event(
                    &target.id,
                    run.step,
                    "passthrough",
                    format!("text copied from `{node_id}`"),
                );
            }

            if run.visited.contains(&target.id) {
                tracing::debug!(target = %target.id, "target already visited in this run");
                continue;
            }

            run.stack.push(Frame::Propagate {
                node_id: node_id.to_string(),
                edge_cursor: offset + 1,
            });
            run.stack.push(Frame::Visit {
                node_id: target.id.clone(),
            });
            return Ok(());
        }
        Ok(())
    }

    /// Cleanup on the way back out of an executed node: lower its running
    /// marker and check whether the run now covers the reachable set.
    ///
    /// Coverage is judged against a fresh read of the graph: only visited
    /// nodes still inside the reachable set count, and every currently
    /// reachable node must be among them. A node locked or deleted after its
    /// visit drops out of both sides of the comparison, so a shrunken graph
    /// cannot finalize the run while reachable nodes are still pending.
    async fn finish_node(&mut self, run: &CascadeState, node_id: &str) {
        if let Err(error) = self.store.set_running(node_id, false).await {
            tracing::warn!(node_id, %error, "failed to clear running marker");
        }

        let (covered, required) = match self.coverage(run).await {
            Ok(counts) => counts,
            Err(error) => {
                tracing::warn!(node_id, %error, "coverage re-read failed, falling back to tracked counts");
                (
                    run.visited.len(),
                    self.progress.snapshot().total_nodes_for_execution,
                )
            }
        };
        if self.progress.finalize_if_complete(covered, required) {
            tracing::debug!(
                node_id,
                covered,
                required,
                "cascade covered its reachable set, progress finalized"
            );
        }
    }

    /// Visited-and-still-reachable count alongside the current reachable
    /// count, from one fresh read of the graph.
    async fn coverage(&self, run: &CascadeState) -> Result<(usize, usize), GraphStoreError> {
        let nodes = self.store.get_nodes().await?;
        let edges = self.store.get_edges().await?;
        let reachable = reachability::reachable_ids(&run.start_node_id, &nodes, &edges);
        let covered = reachable
            .iter()
            .filter(|id| run.visited.contains(id.as_str()))
            .count();
        Ok((covered, reachable.len()))
    }

    /// Failure path: drain pending cleanup frames so no node is left with a
    /// raised running marker.
    async fn unwind(&mut self, run: &mut CascadeState) {
        while let Some(frame) = run.stack.pop() {
            if let Frame::Finish { node_id } = frame
                && let Err(error) = self.store.set_running(&node_id, false).await
            {
                tracing::warn!(node_id = %node_id, %error, "failed to clear running marker during unwind");
            }
        }
    }
}

impl CascadeRunner {
    /// Best-effort event emission; a dropped event never fails the run.
    #[inline]
    fn emit_node_event(&self, node_id: &str, step: u64, scope: &str, message: String) {
        let event = Event::node_message_with_meta(node_id, step, scope, message);
        if self.event_sender.send(event).is_err() {
            tracing::debug!(node_id, scope, "event dropped: event bus unavailable");
        }
    }

    /// Apply a payload patch, tolerating a concurrent delete of the target.
    async fn apply_patch(&self, node_id: &str, patch: NodeDataPatch) -> Result<(), RunnerError> {
        match self.store.patch_node_data(node_id, patch).await {
            Ok(_) => Ok(()),
            Err(GraphStoreError::NodeNotFound { .. }) => {
                tracing::debug!(node_id, "node vanished before its patch applied");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn finalize_event_stream(&self, session_id: &str, reason: StreamEndReason) {
        let message = match reason {
            StreamEndReason::Completed { steps } => {
                format!("session={session_id} status=completed steps={steps}")
            }
            StreamEndReason::Error { step, error } => step
                .map(|s| format!("session={session_id} status=error step={s} error={error}"))
                .unwrap_or_else(|| format!("session={session_id} status=error error={error}")),
        };

        if self
            .event_sender
            .send(Event::diagnostic(STREAM_END_SCOPE, message.clone()))
            .is_err()
        {
            tracing::debug!(
                session = %session_id,
                scope = STREAM_END_SCOPE,
                completion_message = %message,
                "failed to emit stream termination event"
            );
        }
    }
}
