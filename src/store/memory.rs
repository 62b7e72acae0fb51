//! Lock-guarded in-memory graph store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::node::{CanvasEdge, CanvasNode, NodeDataPatch};

use super::{GraphStore, GraphStoreError};

#[derive(Debug, Default)]
struct CanvasState {
    nodes: Vec<CanvasNode>,
    edges: Vec<CanvasEdge>,
}

/// In-memory [`GraphStore`] backed by a `tokio::sync::RwLock`.
///
/// Nodes and edges are kept in insertion order, which makes branch walk
/// order deterministic for a given build sequence. Suited to tests, demos,
/// and single-process embedding.
///
/// # Examples
///
/// ```rust
/// use canvasflow::node::{CanvasEdge, CanvasNode};
/// use canvasflow::store::InMemoryGraphStore;
///
/// let store = InMemoryGraphStore::new()
///     .with_node(CanvasNode::text("a", "hello"))
///     .with_node(CanvasNode::text("b", ""))
///     .with_edge(CanvasEdge::between("a", "b"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<CanvasState>,
}

impl InMemoryGraphStore {
    /// Create an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a canvas from prebuilt node and edge lists.
    #[must_use]
    pub fn from_parts(nodes: Vec<CanvasNode>, edges: Vec<CanvasEdge>) -> Self {
        Self {
            state: RwLock::new(CanvasState { nodes, edges }),
        }
    }

    /// Add a node, builder-style. Replaces an existing node with the same id.
    #[must_use]
    pub fn with_node(self, node: CanvasNode) -> Self {
        {
            let mut state = self
                .state
                .try_write()
                .expect("builder used before the store is shared");
            upsert_node_in(&mut state.nodes, node);
        }
        self
    }

    /// Add an edge, builder-style. Replaces an existing edge with the same id.
    #[must_use]
    pub fn with_edge(self, edge: CanvasEdge) -> Self {
        {
            let mut state = self
                .state
                .try_write()
                .expect("builder used before the store is shared");
            upsert_edge_in(&mut state.edges, edge);
        }
        self
    }
}

fn upsert_node_in(nodes: &mut Vec<CanvasNode>, node: CanvasNode) {
    if let Some(existing) = nodes.iter_mut().find(|n| n.id == node.id) {
        *existing = node;
    } else {
        nodes.push(node);
    }
}

fn upsert_edge_in(edges: &mut Vec<CanvasEdge>, edge: CanvasEdge) {
    if let Some(existing) = edges.iter_mut().find(|e| e.id == edge.id) {
        *existing = edge;
    } else {
        edges.push(edge);
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn get_nodes(&self) -> Result<Vec<CanvasNode>, GraphStoreError> {
        Ok(self.state.read().await.nodes.clone())
    }

    async fn get_edges(&self) -> Result<Vec<CanvasEdge>, GraphStoreError> {
        Ok(self.state.read().await.edges.clone())
    }

    async fn get_node(&self, node_id: &str) -> Result<CanvasNode, GraphStoreError> {
        self.state
            .read()
            .await
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .cloned()
            .ok_or_else(|| GraphStoreError::NodeNotFound {
                node_id: node_id.to_string(),
            })
    }

    async fn patch_node_data(
        &self,
        node_id: &str,
        patch: NodeDataPatch,
    ) -> Result<CanvasNode, GraphStoreError> {
        let mut state = self.state.write().await;
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| GraphStoreError::NodeNotFound {
                node_id: node_id.to_string(),
            })?;
        if !node.data.merge(&patch) {
            return Err(GraphStoreError::KindMismatch {
                node_id: node_id.to_string(),
                node_kind: node.kind(),
                patch_kind: patch.kind(),
            });
        }
        Ok(node.clone())
    }

    async fn set_locked(&self, node_id: &str, locked: bool) -> Result<(), GraphStoreError> {
        let mut state = self.state.write().await;
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| GraphStoreError::NodeNotFound {
                node_id: node_id.to_string(),
            })?;
        node.locked = locked;
        Ok(())
    }

    async fn set_running(&self, node_id: &str, running: bool) -> Result<(), GraphStoreError> {
        let mut state = self.state.write().await;
        let node = state
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| GraphStoreError::NodeNotFound {
                node_id: node_id.to_string(),
            })?;
        node.running = running;
        Ok(())
    }

    async fn upsert_node(&self, node: CanvasNode) -> Result<(), GraphStoreError> {
        let mut state = self.state.write().await;
        upsert_node_in(&mut state.nodes, node);
        Ok(())
    }

    async fn upsert_edge(&self, edge: CanvasEdge) -> Result<(), GraphStoreError> {
        let mut state = self.state.write().await;
        upsert_edge_in(&mut state.edges, edge);
        Ok(())
    }

    async fn remove_node(&self, node_id: &str) -> Result<(), GraphStoreError> {
        let mut state = self.state.write().await;
        state.nodes.retain(|n| n.id != node_id);
        // Dropping a node orphans its connections; drop those too.
        state
            .edges
            .retain(|e| e.source != node_id && e.target != node_id);
        Ok(())
    }

    async fn remove_edge(&self, edge_id: &str) -> Result<(), GraphStoreError> {
        let mut state = self.state.write().await;
        state.edges.retain(|e| e.id != edge_id);
        Ok(())
    }
}
