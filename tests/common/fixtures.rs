//! Canvas and config fixtures shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use canvasflow::node::{CanvasEdge, CanvasNode};
use canvasflow::runtimes::{EventBusConfig, RuntimeConfig, SinkConfig};
use canvasflow::store::InMemoryGraphStore;

/// Config for deterministic tests: fixed session id, zero settle delay,
/// events captured in memory instead of printed.
pub fn test_config() -> RuntimeConfig {
    RuntimeConfig::new(Some("test-session".into()), Some(Duration::ZERO))
        .with_event_bus(EventBusConfig::new(vec![SinkConfig::Memory]))
}

/// `a(text) -> b(image)`.
pub fn linear_canvas() -> Arc<InMemoryGraphStore> {
    Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "seed"))
            .with_node(CanvasNode::image("b", "render"))
            .with_edge(CanvasEdge::between("a", "b")),
    )
}

/// `a <-> b`, the smallest cycle.
pub fn cycle_canvas() -> Arc<InMemoryGraphStore> {
    Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "ping"))
            .with_node(CanvasNode::text("b", "pong"))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("b", "a")),
    )
}

/// `a -> c(locked) -> d`: the lock fences off c and everything behind it.
pub fn locked_chain_canvas() -> Arc<InMemoryGraphStore> {
    Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "start"))
            .with_node(CanvasNode::text("c", "pinned").with_locked(true))
            .with_node(CanvasNode::text("d", "behind the lock"))
            .with_edge(CanvasEdge::between("a", "c"))
            .with_edge(CanvasEdge::between("c", "d")),
    )
}

/// Diamond join: `a -> b -> d` and `a -> c -> d`.
pub fn diamond_canvas() -> Arc<InMemoryGraphStore> {
    Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("a", "top"))
            .with_node(CanvasNode::text("b", "left"))
            .with_node(CanvasNode::text("c", "right"))
            .with_node(CanvasNode::text("d", "join"))
            .with_edge(CanvasEdge::between("a", "b"))
            .with_edge(CanvasEdge::between("a", "c"))
            .with_edge(CanvasEdge::between("b", "d"))
            .with_edge(CanvasEdge::between("c", "d")),
    )
}
