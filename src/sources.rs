//! Edge-order helpers: connectivity, direct sources, and node eligibility.
//!
//! Everything here operates on freshly read node and edge lists rather than
//! a prebuilt adjacency structure. The cascade re-reads the graph store at
//! every step, so eligibility and source gathering always reflect concurrent
//! edits made while the run is in flight.

use std::fmt;

use crate::node::{CanvasEdge, CanvasNode};

/// Number of edges referencing a node as either endpoint.
#[must_use]
pub fn connected_edge_count(node_id: &str, edges: &[CanvasEdge]) -> usize {
    edges
        .iter()
        .filter(|edge| edge.source == node_id || edge.target == node_id)
        .count()
}

/// Edges leaving a node, in store order.
#[must_use]
pub fn outgoing_edges<'a>(node_id: &str, edges: &'a [CanvasEdge]) -> Vec<&'a CanvasEdge> {
    edges.iter().filter(|edge| edge.source == node_id).collect()
}

/// Direct upstream nodes carrying executable payload, in store edge order.
///
/// One hop only: executors see their immediate predecessors' current data,
/// never a transitively resolved input chain. Comment and website nodes are
/// not payload sources and are filtered out. Dangling edges (whose source
/// node no longer exists) are skipped; a concurrent delete can leave them
/// behind for a step.
#[must_use]
pub fn direct_sources(
    node_id: &str,
    nodes: &[CanvasNode],
    edges: &[CanvasEdge],
) -> Vec<CanvasNode> {
    edges
        .iter()
        .filter(|edge| edge.target == node_id)
        .filter_map(|edge| {
            let found = nodes.iter().find(|node| node.id == edge.source);
            if found.is_none() {
                tracing::debug!(edge_id = %edge.id, source = %edge.source, "skipping dangling edge");
            }
            found
        })
        .filter(|source| source.kind().is_source_kind())
        .cloned()
        .collect()
}

/// Whether a node may execute at this step, and if not, why.
///
/// Checks are ordered: connectivity first, then the user lock, then the
/// running marker. An ineligible node is skipped with a logged reason; a
/// skip is a normal outcome, never an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// The node may execute.
    Eligible,
    /// No edge references the node; isolated nodes never execute.
    NoConnections,
    /// The user pinned the node; it executes neither itself nor its subtree.
    Locked,
    /// The node is already mid-execution in this or another cascade.
    AlreadyRunning,
}

impl Eligibility {
    /// Assess a node against the current edge list.
    #[must_use]
    pub fn assess(node: &CanvasNode, edges: &[CanvasEdge]) -> Self {
        if connected_edge_count(&node.id, edges) == 0 {
            Eligibility::NoConnections
        } else if node.locked {
            Eligibility::Locked
        } else if node.running {
            Eligibility::AlreadyRunning
        } else {
            Eligibility::Eligible
        }
    }

    #[must_use]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    /// Human-readable skip reason, `None` when eligible.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::NoConnections => Some("no connections"),
            Eligibility::Locked => Some("locked"),
            Eligibility::AlreadyRunning => Some("already running"),
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.skip_reason() {
            Some(reason) => write!(f, "{reason}"),
            None => write!(f, "eligible"),
        }
    }
}
