use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use canvasflow::event_bus::{Event, EventBus, MemorySink, STREAM_END_SCOPE};
use canvasflow::executor::{ExecutionContext, ExecutionSnapshot, Executor, ExecutorError};
use canvasflow::node::{CanvasEdge, CanvasNode, NodeData, NodeDataPatch, TextPatch};
use canvasflow::registry::CapabilityRegistry;
use canvasflow::runtimes::{CascadeRunner, ProgressSnapshot, RunnerError, SkippedNode};
use canvasflow::sources::Eligibility;
use canvasflow::store::{GraphStore, GraphStoreError, InMemoryGraphStore};
use canvasflow::types::NodeKind;

mod common;
use common::*;

#[tokio::test]
async fn linear_cascade_executes_both_nodes() {
    let store = linear_canvas();
    let recorder = RecordingExecutor::new();
    let registry = CapabilityRegistry::new()
        .with_executor("a", NodeKind::Text, Arc::new(recorder.clone()))
        .with_executor("b", NodeKind::Image, Arc::new(recorder.clone()));

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.session_id, "test-session");
    assert_eq!(report.start_node_id, "a");
    assert_eq!(report.steps, 2);
    assert_eq!(report.executed_nodes, vec!["a", "b"]);
    assert!(report.skipped_nodes.is_empty());
    assert_eq!(recorder.invocations(), vec!["a", "b"]);
    assert_no_running_markers(&store).await;
}

#[tokio::test]
async fn progress_counts_reach_total_before_reset() {
    let store = linear_canvas();
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());

    let mut runner = CascadeRunner::with_config_and_bus(
        store,
        CapabilityRegistry::new(),
        test_config(),
        bus,
        true,
    );
    runner.run("a").await.expect("cascade completes");

    // Let the listener drain the channel before snapshotting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    runner.event_bus().stop_listener().await;

    let progress: Vec<_> = sink
        .snapshot()
        .into_iter()
        .filter_map(|event| match event {
            Event::Progress(progress) => Some(progress),
            _ => None,
        })
        .collect();

    assert!(
        !progress.is_empty(),
        "expected progress events on the bus, got none"
    );
    assert!(
        progress
            .iter()
            .any(|p| p.is_executing() && p.executed_nodes_count() == 2
                && p.total_nodes_for_execution() == 2),
        "expected the count to reach 2/2 while executing, got: {progress:?}"
    );
    let last = progress.last().unwrap();
    assert!(!last.is_executing());
    assert_eq!(last.executed_nodes_count(), 0);
    assert_eq!(last.total_nodes_for_execution(), 0);
}

#[tokio::test]
async fn cycle_terminates_with_each_node_once() {
    let store = cycle_canvas();
    let mut runner = CascadeRunner::with_config(store.clone(), CapabilityRegistry::new(), test_config());

    let report = runner.run("a").await.expect("cycle must terminate");

    assert_eq!(report.executed_nodes, vec!["a", "b"]);
    // The back edge b -> a finds a still mid-execution.
    assert_eq!(
        report.skipped_nodes,
        vec![SkippedNode {
            node_id: "a".into(),
            reason: Eligibility::AlreadyRunning,
        }]
    );
    assert_no_running_markers(&store).await;
    // Text flowed forward along a -> b before the back edge was refused.
    assert_text_payload(&store, "b", "ping").await;
}

#[tokio::test]
async fn locked_node_fences_subtree() {
    let store = locked_chain_canvas();
    let recorder = RecordingExecutor::new();
    let registry = CapabilityRegistry::new()
        .with_executor("a", NodeKind::Text, Arc::new(recorder.clone()))
        .with_executor("c", NodeKind::Text, Arc::new(recorder.clone()))
        .with_executor("d", NodeKind::Text, Arc::new(recorder.clone()));

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a"]);
    assert_eq!(
        report.skipped_nodes,
        vec![SkippedNode {
            node_id: "c".into(),
            reason: Eligibility::Locked,
        }]
    );
    assert_eq!(recorder.invocations(), vec!["a"]);
    // The lock also blocks the passthrough copy into c.
    assert_text_payload(&store, "c", "pinned").await;
    assert_text_payload(&store, "d", "behind the lock").await;
    // Only a was reachable, so the run finalizes back to idle.
    assert_eq!(runner.progress(), ProgressSnapshot::default());
}

#[tokio::test]
async fn isolated_start_skips_without_execution() {
    let store = Arc::new(InMemoryGraphStore::new().with_node(CanvasNode::text("a", "alone")));
    let mut runner = CascadeRunner::with_config(store.clone(), CapabilityRegistry::new(), test_config());

    let report = runner.run("a").await.expect("skip-only run completes");

    assert_eq!(report.steps, 0);
    assert!(report.executed_nodes.is_empty());
    assert_eq!(
        report.skipped_nodes,
        vec![SkippedNode {
            node_id: "a".into(),
            reason: Eligibility::NoConnections,
        }]
    );
    // Nothing executed, so no finalization fires: the denominator keeps its
    // seeded value and only the executing flag is lowered on exit.
    assert_eq!(
        runner.progress(),
        ProgressSnapshot {
            is_executing: false,
            total_nodes_for_execution: 1,
            executed_nodes_count: 0,
        }
    );
}

#[tokio::test]
async fn executor_failure_aborts_and_cleans_up() {
    let store = linear_canvas();
    let recorder = RecordingExecutor::new();
    let registry = CapabilityRegistry::new()
        .with_executor("a", NodeKind::Text, Arc::new(recorder.clone()))
        .with_executor("b", NodeKind::Image, Arc::new(FailingExecutor::default()));

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let error = runner.run("a").await.expect_err("executor failure surfaces");

    match error {
        RunnerError::Executor { node_id, step, .. } => {
            assert_eq!(node_id, "b");
            assert_eq!(step, 2);
        }
        other => panic!("expected an executor error, got: {other:?}"),
    }
    // a executed before the abort; its marker (and b's) must be cleared.
    assert_eq!(recorder.invocations(), vec!["a"]);
    assert_no_running_markers(&store).await;
    assert_eq!(runner.progress(), ProgressSnapshot::default());
}

#[tokio::test]
async fn diamond_join_executes_once() {
    let store = diamond_canvas();
    let recorder = RecordingExecutor::new();
    let mut registry = CapabilityRegistry::new();
    for id in ["a", "b", "c", "d"] {
        registry.register(id, NodeKind::Text, Arc::new(recorder.clone()));
    }

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    // Depth-first in store edge order: the whole a -> b -> d branch runs
    // before a's second edge into c is considered.
    assert_eq!(report.executed_nodes, vec!["a", "b", "d", "c"]);
    assert_eq!(
        recorder
            .invocations()
            .iter()
            .filter(|id| id.as_str() == "d")
            .count(),
        1,
        "join node must execute exactly once"
    );
    assert_no_running_markers(&store).await;
}

#[tokio::test]
async fn text_passthrough_copies_content() {
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("draft", "release announcement"))
            .with_node(CanvasNode::text("copy", ""))
            .with_edge(CanvasEdge::between("draft", "copy")),
    );
    let mut runner = CascadeRunner::with_config(store.clone(), CapabilityRegistry::new(), test_config());

    runner.run("draft").await.expect("cascade completes");

    assert_text_payload(&store, "copy", "release announcement").await;
}

#[tokio::test]
async fn passthrough_skips_non_text_targets() {
    let store = linear_canvas();
    let mut runner = CascadeRunner::with_config(store.clone(), CapabilityRegistry::new(), test_config());

    runner.run("a").await.expect("cascade completes");

    let node = store.get_node("b").await.expect("b exists");
    match &node.data {
        NodeData::Image(data) => assert_eq!(
            data.prompt, "render",
            "image payloads take no passthrough text"
        ),
        other => panic!("expected b to stay an image node, got: {other:?}"),
    }
}

#[tokio::test]
async fn passthrough_recopies_to_already_visited_target() {
    let store = diamond_canvas();
    // c rewrites its own text during its step; the later c -> d edge still
    // copies text forward even though d already executed.
    let registry = CapabilityRegistry::new().with_executor(
        "c",
        NodeKind::Text,
        Arc::new(PatchingExecutor::new(NodeDataPatch::Text(TextPatch::content(
            "from-c",
        )))),
    );

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "b", "d", "c"]);
    assert_text_payload(&store, "d", "from-c").await;
}

#[tokio::test]
async fn branches_run_in_store_edge_order() {
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "root"))
            .with_node(CanvasNode::text("b", ""))
            .with_node(CanvasNode::text("b2", ""))
            .with_node(CanvasNode::text("c", ""))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("b", "b2"))
            .with_edge(CanvasEdge::between("a", "c")),
    );
    let mut runner = CascadeRunner::with_config(store, CapabilityRegistry::new(), test_config());

    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "b", "b2", "c"]);
}

#[tokio::test]
async fn missing_start_node_completes_empty() {
    let store = linear_canvas();
    let mut runner = CascadeRunner::with_config(store, CapabilityRegistry::new(), test_config());

    let report = runner.run("ghost").await.expect("missing start is not an error");

    assert_eq!(report.steps, 0);
    assert!(report.executed_nodes.is_empty());
    assert!(report.skipped_nodes.is_empty());
    assert!(!runner.progress().is_executing);
}

#[tokio::test]
async fn missing_session_id_is_an_error() {
    let store = linear_canvas();
    let config = canvasflow::runtimes::RuntimeConfig::new(None, Some(Duration::ZERO))
        .with_event_bus(canvasflow::runtimes::EventBusConfig::new(vec![
            canvasflow::runtimes::SinkConfig::Memory,
        ]));
    let mut runner = CascadeRunner::with_config(store.clone(), CapabilityRegistry::new(), config);

    let error = runner.run("a").await.expect_err("no session id, no run");
    assert!(matches!(error, RunnerError::MissingRunContext));
    assert_no_running_markers(&store).await;
}

#[tokio::test]
async fn unregistered_executor_is_carried_through() {
    let store = linear_canvas();
    // Nothing registered at all: both nodes pass through untouched.
    let mut runner = CascadeRunner::with_config(store.clone(), CapabilityRegistry::new(), test_config());

    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "b"]);
    assert_text_payload(&store, "a", "seed").await;
}

#[tokio::test]
async fn kind_mismatched_registration_misses() {
    let store = linear_canvas();
    let recorder = RecordingExecutor::new();
    // b is an image node; a registration made for text must not dispatch.
    let registry =
        CapabilityRegistry::new().with_executor("b", NodeKind::Text, Arc::new(recorder.clone()));

    let mut runner = CascadeRunner::with_config(store, registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "b"]);
    assert_eq!(recorder.count(), 0, "mismatched registration must not run");
}

/// Executor that locks another node mid-run, the way a user pinning a node
/// from the UI would.
struct LockingExecutor {
    store: Arc<InMemoryGraphStore>,
    target: &'static str,
}

#[async_trait]
impl Executor for LockingExecutor {
    async fn execute(
        &self,
        _snapshot: ExecutionSnapshot,
        _ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        self.store
            .set_locked(self.target, true)
            .await
            .expect("lock target exists");
        Ok(None)
    }
}

#[tokio::test]
async fn locking_mid_run_shrinks_reachable_total() {
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "one"))
            .with_node(CanvasNode::text("b", "two"))
            .with_node(CanvasNode::text("c", "three"))
            .with_node(CanvasNode::text("d", "four"))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("b", "c"))
            .with_edge(CanvasEdge::between("c", "d")),
    );
    // While b executes, d gets locked out from under the run.
    let registry = CapabilityRegistry::new().with_executor(
        "b",
        NodeKind::Text,
        Arc::new(LockingExecutor {
            store: store.clone(),
            target: "d",
        }),
    );

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "b", "c"]);
    assert_eq!(
        report.skipped_nodes,
        vec![SkippedNode {
            node_id: "d".into(),
            reason: Eligibility::Locked,
        }]
    );
    // c's step recomputed the denominator with d locked out, so the run
    // covers the shrunken reachable set and finalizes.
    assert_eq!(runner.progress(), ProgressSnapshot::default());
    assert_no_running_markers(&store).await;
}

/// What a concurrent edit does to the canvas.
#[derive(Clone, Copy)]
enum CanvasEdit {
    Lock(&'static str),
    Unlock(&'static str),
    Remove(&'static str),
}

/// Which store operation the edit lands on.
#[derive(Clone, Copy)]
enum EditTrigger {
    /// A payload patch applied to this node (a passthrough copy landing).
    PatchOf(&'static str),
    /// This node's running marker being raised (its step beginning).
    RunningRaised(&'static str),
    /// This node's running marker being cleared (its cleanup starting).
    RunningCleared(&'static str),
}

/// Delegating store that lands one concurrent canvas edit the moment a
/// chosen operation applies, the way a user editing mid-run races the
/// cascade between its re-reads.
struct EditRacingStore {
    inner: Arc<InMemoryGraphStore>,
    trigger: EditTrigger,
    edit: CanvasEdit,
}

impl EditRacingStore {
    async fn apply_edit(&self) {
        match self.edit {
            CanvasEdit::Lock(id) => self.inner.set_locked(id, true).await,
            CanvasEdit::Unlock(id) => self.inner.set_locked(id, false).await,
            CanvasEdit::Remove(id) => self.inner.remove_node(id).await,
        }
        .expect("racing edit applies");
    }
}

#[async_trait]
impl GraphStore for EditRacingStore {
    async fn get_nodes(&self) -> Result<Vec<CanvasNode>, GraphStoreError> {
        self.inner.get_nodes().await
    }

    async fn get_edges(&self) -> Result<Vec<CanvasEdge>, GraphStoreError> {
        self.inner.get_edges().await
    }

    async fn get_node(&self, node_id: &str) -> Result<CanvasNode, GraphStoreError> {
        self.inner.get_node(node_id).await
    }

    async fn patch_node_data(
        &self,
        node_id: &str,
        patch: NodeDataPatch,
    ) -> Result<CanvasNode, GraphStoreError> {
        let node = self.inner.patch_node_data(node_id, patch).await?;
        if let EditTrigger::PatchOf(id) = self.trigger
            && id == node_id
        {
            self.apply_edit().await;
        }
        Ok(node)
    }

    async fn set_locked(&self, node_id: &str, locked: bool) -> Result<(), GraphStoreError> {
        self.inner.set_locked(node_id, locked).await
    }

    async fn set_running(&self, node_id: &str, running: bool) -> Result<(), GraphStoreError> {
        self.inner.set_running(node_id, running).await?;
        match self.trigger {
            EditTrigger::RunningRaised(id) if id == node_id && running => self.apply_edit().await,
            EditTrigger::RunningCleared(id) if id == node_id && !running => self.apply_edit().await,
            _ => {}
        }
        Ok(())
    }

    async fn upsert_node(&self, node: CanvasNode) -> Result<(), GraphStoreError> {
        self.inner.upsert_node(node).await
    }

    async fn upsert_edge(&self, edge: CanvasEdge) -> Result<(), GraphStoreError> {
        self.inner.upsert_edge(edge).await
    }

    async fn remove_node(&self, node_id: &str) -> Result<(), GraphStoreError> {
        self.inner.remove_node(node_id).await
    }

    async fn remove_edge(&self, edge_id: &str) -> Result<(), GraphStoreError> {
        self.inner.remove_edge(edge_id).await
    }
}

#[tokio::test]
async fn lock_racing_a_scheduled_visit_still_resets_progress() {
    let canvas = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "fan out"))
            .with_node(CanvasNode::text("b", ""))
            .with_node(CanvasNode::text("c", ""))
            .with_node(CanvasNode::text("d", ""))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("a", "c"))
            .with_edge(CanvasEdge::between("a", "d")),
    );
    // The lock lands the instant the passthrough copy into b applies: after
    // a's propagation judged b eligible, before b's own step re-reads it.
    let store = Arc::new(EditRacingStore {
        inner: canvas.clone(),
        trigger: EditTrigger::PatchOf("b"),
        edit: CanvasEdit::Lock("b"),
    });
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());

    let mut runner = CascadeRunner::with_config_and_bus(
        store,
        CapabilityRegistry::new(),
        test_config(),
        bus,
        true,
    );
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "c", "d"]);
    assert_eq!(
        report.skipped_nodes,
        vec![SkippedNode {
            node_id: "b".into(),
            reason: Eligibility::Locked,
        }]
    );
    // The copy into b landed before the lock did.
    assert_text_payload(&canvas, "b", "fan out").await;
    // b sits in the visited set but outside the shrunken reachable set; the
    // cleanups walking back out must not finalize until c and d have run,
    // and the last one must reset the signal to idle.
    assert_eq!(runner.progress(), ProgressSnapshot::default());
    assert_no_running_markers(&canvas).await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    runner.event_bus().stop_listener().await;
    let progress: Vec<_> = sink
        .snapshot()
        .into_iter()
        .filter_map(|event| match event {
            Event::Progress(progress) => Some(progress),
            _ => None,
        })
        .collect();
    let (last, live) = progress.split_last().expect("progress events were published");
    assert!(
        live.iter().all(|p| p.is_executing()),
        "signal must stay executing until the reachable set is covered, got: {progress:?}"
    );
    assert!(!last.is_executing());
    assert_eq!(last.executed_nodes_count(), 0);
    assert_eq!(last.total_nodes_for_execution(), 0);
}

#[tokio::test]
async fn unlock_landing_mid_run_extends_coverage() {
    let canvas = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "root"))
            .with_node(CanvasNode::text("b", ""))
            .with_node(CanvasNode::text("c", "held").with_locked(true))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("a", "c")),
    );
    // c is unlocked while b's cleanup runs: the reachable set grows after
    // b executed, and a's second edge picks c up on its re-read.
    let store = Arc::new(EditRacingStore {
        inner: canvas.clone(),
        trigger: EditTrigger::RunningCleared("b"),
        edit: CanvasEdit::Unlock("c"),
    });

    let mut runner = CascadeRunner::with_config(store, CapabilityRegistry::new(), test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "b", "c"]);
    assert!(report.skipped_nodes.is_empty());
    // b's cleanup saw c freshly reachable and unvisited, so it must not
    // finalize; only c's own cleanup covers the grown set.
    assert_eq!(runner.progress(), ProgressSnapshot::default());
    assert_text_payload(&canvas, "c", "root").await;
    assert_no_running_markers(&canvas).await;
}

#[tokio::test]
async fn delete_racing_a_scheduled_visit_is_tolerated() {
    let canvas = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "fan out"))
            .with_node(CanvasNode::text("b", ""))
            .with_node(CanvasNode::text("c", ""))
            .with_edge(CanvasEdge::between("a", "c"))
            .with_edge(CanvasEdge::between("a", "b")),
    );
    // b is deleted the instant its passthrough copy applies: a's propagation
    // already judged it eligible, and its visit finds it gone.
    let store = Arc::new(EditRacingStore {
        inner: canvas.clone(),
        trigger: EditTrigger::PatchOf("b"),
        edit: CanvasEdit::Remove("b"),
    });

    let mut runner = CascadeRunner::with_config(store, CapabilityRegistry::new(), test_config());
    let report = runner.run("a").await.expect("cascade completes");

    // A vanished target is neither executed nor a recorded skip: the
    // cascade logs it and moves on.
    assert_eq!(report.executed_nodes, vec!["a", "c"]);
    assert!(report.skipped_nodes.is_empty());
    assert_eq!(report.steps, 2);
    assert!(matches!(
        canvas.get_node("b").await,
        Err(GraphStoreError::NodeNotFound { .. })
    ));
    // b stays in the visited set but leaves the reachable set with its
    // deletion, so the run still finalizes to idle.
    assert_eq!(runner.progress(), ProgressSnapshot::default());
    assert_no_running_markers(&canvas).await;
}

#[tokio::test]
async fn node_deleted_during_its_own_step_is_carried_through() {
    let canvas = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "head"))
            .with_node(CanvasNode::text("b", ""))
            .with_node(CanvasNode::text("c", "tail"))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("b", "c")),
    );
    // b vanishes right after its running marker goes up: the dispatch
    // re-read misses it and the step is carried through without an executor.
    let store = Arc::new(EditRacingStore {
        inner: canvas.clone(),
        trigger: EditTrigger::RunningRaised("b"),
        edit: CanvasEdit::Remove("b"),
    });

    let mut runner = CascadeRunner::with_config(store, CapabilityRegistry::new(), test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a", "b"]);
    assert!(report.skipped_nodes.is_empty());
    // b's cleanup tolerates the missing node, and c went out of reach with
    // the deleted edge, so coverage is judged against {a} alone.
    assert_eq!(runner.progress(), ProgressSnapshot::default());
    assert_text_payload(&canvas, "c", "tail").await;
    assert_no_running_markers(&canvas).await;
}

/// Executor that deletes another node mid-run, the way a user pruning the
/// canvas during a cascade would.
struct DeletingExecutor {
    store: Arc<InMemoryGraphStore>,
    target: &'static str,
}

#[async_trait]
impl Executor for DeletingExecutor {
    async fn execute(
        &self,
        _snapshot: ExecutionSnapshot,
        _ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        self.store
            .remove_node(self.target)
            .await
            .expect("removal accepts any id");
        Ok(None)
    }
}

#[tokio::test]
async fn executor_deleting_downstream_node_completes_cleanly() {
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "head"))
            .with_node(CanvasNode::text("b", ""))
            .with_node(CanvasNode::text("c", "tail"))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("b", "c")),
    );
    // While a executes, b is deleted out from under the run, taking both of
    // its edges with it.
    let registry = CapabilityRegistry::new().with_executor(
        "a",
        NodeKind::Text,
        Arc::new(DeletingExecutor {
            store: store.clone(),
            target: "b",
        }),
    );

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    assert_eq!(report.executed_nodes, vec!["a"]);
    assert!(report.skipped_nodes.is_empty());
    assert_eq!(report.steps, 1);
    // The orphaned tail is out of reach and left untouched.
    assert_text_payload(&store, "c", "tail").await;
    assert_eq!(runner.progress(), ProgressSnapshot::default());
    assert_no_running_markers(&store).await;
}

#[tokio::test]
async fn dangling_edge_is_ignored_during_propagation() {
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "root"))
            .with_node(CanvasNode::text("b", ""))
            .with_edge(CanvasEdge::between("a", "ghost"))
            .with_edge(CanvasEdge::between("a", "b")),
    );
    let mut runner = CascadeRunner::with_config(store.clone(), CapabilityRegistry::new(), test_config());

    let report = runner.run("a").await.expect("cascade completes");

    // The edge into a node that does not exist is passed over silently; the
    // next edge still propagates.
    assert_eq!(report.executed_nodes, vec!["a", "b"]);
    assert!(report.skipped_nodes.is_empty());
    assert_text_payload(&store, "b", "root").await;
    assert_eq!(runner.progress(), ProgressSnapshot::default());
}

/// Executor that deletes its own node and still hands back a patch, the way
/// a user deleting a node races its in-flight result.
struct SelfDeletingPatcher {
    store: Arc<InMemoryGraphStore>,
}

#[async_trait]
impl Executor for SelfDeletingPatcher {
    async fn execute(
        &self,
        snapshot: ExecutionSnapshot,
        _ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        self.store
            .remove_node(&snapshot.node.id)
            .await
            .expect("removal accepts any id");
        Ok(Some(NodeDataPatch::Text(TextPatch::content(
            "orphaned result",
        ))))
    }
}

#[tokio::test]
async fn patch_for_a_deleted_node_is_dropped_quietly() {
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "head"))
            .with_node(CanvasNode::text("b", ""))
            .with_edge(CanvasEdge::between("a", "b")),
    );
    let registry = CapabilityRegistry::new().with_executor(
        "b",
        NodeKind::Text,
        Arc::new(SelfDeletingPatcher {
            store: store.clone(),
        }),
    );

    let mut runner = CascadeRunner::with_config(store.clone(), registry, test_config());
    let report = runner.run("a").await.expect("cascade completes");

    // The executor's patch has nowhere to land; the step still counts.
    assert_eq!(report.executed_nodes, vec!["a", "b"]);
    assert!(matches!(
        store.get_node("b").await,
        Err(GraphStoreError::NodeNotFound { .. })
    ));
    assert_eq!(runner.progress(), ProgressSnapshot::default());
    assert_no_running_markers(&store).await;
}

#[tokio::test]
async fn run_emits_stream_end_diagnostic() {
    let store = linear_canvas();
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());

    let mut runner = CascadeRunner::with_config_and_bus(
        store,
        CapabilityRegistry::new(),
        test_config(),
        bus,
        true,
    );
    runner.run("a").await.expect("cascade completes");

    tokio::time::sleep(Duration::from_millis(20)).await;
    runner.event_bus().stop_listener().await;

    let events = sink.snapshot();
    let end = events
        .iter()
        .rev()
        .find_map(|event| match event {
            Event::Diagnostic(diag) if diag.scope() == STREAM_END_SCOPE => Some(diag),
            _ => None,
        })
        .expect("stream end diagnostic emitted");
    assert!(
        end.message().contains("session=test-session"),
        "unexpected terminator: {}",
        end.message()
    );
    assert!(end.message().contains("status=completed steps=2"));
}

#[tokio::test]
async fn settle_delay_is_awaited_per_node() {
    let store = linear_canvas();
    let config = test_config().with_settle_delay(Duration::from_millis(30));
    let mut runner = CascadeRunner::with_config(store, CapabilityRegistry::new(), config);

    let started = Instant::now();
    runner.run("a").await.expect("cascade completes");

    assert!(
        started.elapsed() >= Duration::from_millis(55),
        "two nodes at 30ms settle each should take at least ~60ms, took {:?}",
        started.elapsed()
    );
}
