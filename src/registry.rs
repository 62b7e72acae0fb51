//! Capability registry mapping canvas nodes to their generation executors.
//!
//! Registration is per node id, not per kind: two image nodes on the same
//! canvas can carry differently configured executors, and most nodes carry
//! none at all. Absence of a registration is an expected state: the cascade
//! treats such nodes as pass-through rather than as an error.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::executor::Executor;
use crate::types::NodeKind;

struct Registration {
    kind: NodeKind,
    executor: Arc<dyn Executor>,
}

/// Owner of all executor registrations for one canvas.
///
/// Lookup is checked against the node's current kind. A user can delete a
/// node and reuse its id for a different kind while a stale registration
/// lingers; the kind check makes that lookup miss instead of dispatching the
/// wrong capability.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use canvasflow::registry::CapabilityRegistry;
/// use canvasflow::types::NodeKind;
/// # use async_trait::async_trait;
/// # use canvasflow::executor::{ExecutionContext, ExecutionSnapshot, Executor, ExecutorError};
/// # use canvasflow::node::NodeDataPatch;
/// # struct ImageGen;
/// # #[async_trait]
/// # impl Executor for ImageGen {
/// #     async fn execute(&self, _: ExecutionSnapshot, _: ExecutionContext) -> Result<Option<NodeDataPatch>, ExecutorError> {
/// #         Ok(None)
/// #     }
/// # }
///
/// let mut registry = CapabilityRegistry::new();
/// registry.register("hero-image", NodeKind::Image, Arc::new(ImageGen));
///
/// assert!(registry.executor_for("hero-image", NodeKind::Image).is_some());
/// // Same id, different kind: checked miss, not an error.
/// assert!(registry.executor_for("hero-image", NodeKind::Text).is_none());
/// ```
#[derive(Default)]
pub struct CapabilityRegistry {
    registrations: FxHashMap<String, Registration>,
}

impl CapabilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for a node, builder-style.
    #[must_use]
    pub fn with_executor(
        mut self,
        node_id: impl Into<String>,
        kind: NodeKind,
        executor: Arc<dyn Executor>,
    ) -> Self {
        self.register(node_id, kind, executor);
        self
    }

    /// Register an executor for a node. Re-registering the same id replaces
    /// the previous entry.
    pub fn register(
        &mut self,
        node_id: impl Into<String>,
        kind: NodeKind,
        executor: Arc<dyn Executor>,
    ) {
        let node_id = node_id.into();
        if self
            .registrations
            .insert(node_id.clone(), Registration { kind, executor })
            .is_some()
        {
            tracing::debug!(node_id = %node_id, %kind, "replaced executor registration");
        }
    }

    /// Remove a node's registration. Returns whether one existed.
    pub fn deregister(&mut self, node_id: &str) -> bool {
        self.registrations.remove(node_id).is_some()
    }

    /// Look up the executor for a node of the given kind.
    ///
    /// Returns `None` when the node has no registration or when the
    /// registration was made for a different kind.
    #[must_use]
    pub fn executor_for(&self, node_id: &str, kind: NodeKind) -> Option<Arc<dyn Executor>> {
        let registration = self.registrations.get(node_id)?;
        if registration.kind != kind {
            tracing::debug!(
                node_id = %node_id,
                registered = %registration.kind,
                current = %kind,
                "executor registration kind mismatch, treating as unregistered"
            );
            return None;
        }
        Some(Arc::clone(&registration.executor))
    }

    /// The kind a node was registered under, if any.
    #[must_use]
    pub fn registered_kind(&self, node_id: &str) -> Option<NodeKind> {
        self.registrations.get(node_id).map(|r| r.kind)
    }

    #[must_use]
    pub fn contains(&self, node_id: &str) -> bool {
        self.registrations.contains_key(node_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
