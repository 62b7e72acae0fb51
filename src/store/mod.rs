//! Graph store: the authoritative home of canvas nodes and edges.
//!
//! The orchestrator never holds a private copy of the graph. Every step
//! re-reads nodes and edges through [`GraphStore`] so that concurrent edits
//! (a user locking a node mid-run, an executor patching a payload) are
//! visible to the next step. Updates flow back as narrow operations:
//! payload merge patches, lock toggles, and running markers.
//!
//! [`InMemoryGraphStore`] is the bundled implementation; persistent backends
//! implement the same trait.

mod memory;

pub use memory::InMemoryGraphStore;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::node::{CanvasEdge, CanvasNode, NodeDataPatch};
use crate::types::NodeKind;

/// Errors surfaced by graph store operations.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphStoreError {
    /// The referenced node is not part of the canvas.
    #[error("node `{node_id}` not found in canvas")]
    #[diagnostic(
        code(canvasflow::store::node_not_found),
        help("the node may have been deleted by a concurrent edit; re-read the canvas")
    )]
    NodeNotFound {
        /// Id that failed to resolve.
        node_id: String,
    },

    /// A payload patch targeted a node of a different kind.
    #[error("patch for kind `{patch_kind}` does not apply to node `{node_id}` of kind `{node_kind}`")]
    #[diagnostic(
        code(canvasflow::store::kind_mismatch),
        help("payload patches are typed per node kind; build the patch variant matching the node")
    )]
    KindMismatch {
        node_id: String,
        node_kind: NodeKind,
        patch_kind: NodeKind,
    },
}

/// Storage boundary for canvas graphs.
///
/// Reads return owned snapshots so callers can inspect them without holding
/// store locks across await points. Edge order is load-bearing: the order
/// `get_edges` returns is the order in which execution walks a node's
/// outgoing branches.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// All nodes of the canvas, in insertion order.
    async fn get_nodes(&self) -> Result<Vec<CanvasNode>, GraphStoreError>;

    /// All edges of the canvas, in insertion order.
    async fn get_edges(&self) -> Result<Vec<CanvasEdge>, GraphStoreError>;

    /// A single node by id.
    async fn get_node(&self, node_id: &str) -> Result<CanvasNode, GraphStoreError>;

    /// Merge a payload patch into a node and return the updated node.
    ///
    /// The patch variant must match the node's kind; a mismatch applies
    /// nothing and fails with [`GraphStoreError::KindMismatch`].
    async fn patch_node_data(
        &self,
        node_id: &str,
        patch: NodeDataPatch,
    ) -> Result<CanvasNode, GraphStoreError>;

    /// Set or clear a node's user lock.
    async fn set_locked(&self, node_id: &str, locked: bool) -> Result<(), GraphStoreError>;

    /// Set or clear a node's transient running marker.
    async fn set_running(&self, node_id: &str, running: bool) -> Result<(), GraphStoreError>;

    /// Insert a node, replacing any existing node with the same id.
    async fn upsert_node(&self, node: CanvasNode) -> Result<(), GraphStoreError>;

    /// Insert an edge, replacing any existing edge with the same id.
    async fn upsert_edge(&self, edge: CanvasEdge) -> Result<(), GraphStoreError>;

    /// Remove a node and every edge attached to it. Removing an absent node
    /// is a no-op.
    async fn remove_node(&self, node_id: &str) -> Result<(), GraphStoreError>;

    /// Remove an edge by id. Removing an absent edge is a no-op.
    async fn remove_edge(&self, edge_id: &str) -> Result<(), GraphStoreError>;
}
