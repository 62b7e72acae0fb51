//! Reachable-set accounting for the progress denominator.
//!
//! The cascade recomputes the reachable count from the run's start node at
//! every execution step, against the freshest node and edge lists. Locking a
//! node mid-run therefore shrinks the denominator on the next step: a locked
//! node drops out of the count along with everything behind it.

use rustc_hash::FxHashSet;

use crate::node::{CanvasEdge, CanvasNode};

/// Depth-first walk from `start_id`, visiting each existing node once.
///
/// Branches are taken in store edge order. Locked nodes fence off their
/// subtree: a locked node is never entered as a target, and a locked start
/// is visited but not expanded. Edge targets that resolve to no node are
/// ignored.
fn walk<'a>(
    start_id: &'a str,
    nodes: &'a [CanvasNode],
    edges: &'a [CanvasEdge],
    mut visit: impl FnMut(&'a CanvasNode),
) {
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut stack: Vec<&str> = vec![start_id];

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = nodes.iter().find(|n| n.id == id) else {
            continue;
        };
        visit(node);
        if node.locked {
            continue;
        }
        // Reverse push so the first edge's target pops first.
        for edge in edges.iter().filter(|e| e.source == id).rev() {
            let target = nodes.iter().find(|n| n.id == edge.target);
            if let Some(target) = target
                && !target.locked
                && !visited.contains(target.id.as_str())
            {
                stack.push(target.id.as_str());
            }
        }
    }
}

/// Number of unlocked nodes reachable from `start_id`, plus the start itself.
///
/// Locked nodes and everything behind them are excluded from the count; the
/// start node is the one exception and always contributes 1 when it exists.
/// Returns 0 when the start node does not exist.
///
/// # Examples
///
/// ```rust
/// use canvasflow::node::{CanvasEdge, CanvasNode};
/// use canvasflow::reachability::count_reachable;
///
/// let nodes = vec![
///     CanvasNode::text("a", "root"),
///     CanvasNode::text("b", "").with_locked(true),
///     CanvasNode::text("c", ""),
/// ];
/// let edges = vec![CanvasEdge::between("a", "b"), CanvasEdge::between("b", "c")];
///
/// // b is locked: neither b nor c count toward the total.
/// assert_eq!(count_reachable("a", &nodes, &edges), 1);
/// ```
#[must_use]
pub fn count_reachable(start_id: &str, nodes: &[CanvasNode], edges: &[CanvasEdge]) -> usize {
    let mut count = 0;
    walk(start_id, nodes, edges, |_| count += 1);
    count
}

/// Ids counted by [`count_reachable`], in depth-first preorder with the
/// first branch first.
///
/// Mirrors the order a cascade would reach the countable nodes in.
#[must_use]
pub fn reachable_ids(start_id: &str, nodes: &[CanvasNode], edges: &[CanvasEdge]) -> Vec<String> {
    let mut ids = Vec::new();
    walk(start_id, nodes, edges, |node| ids.push(node.id.clone()));
    ids
}
