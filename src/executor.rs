//! Executor framework for canvas node generation.
//!
//! The [`Executor`] trait is the seam between the cascade and whatever
//! actually produces content (image models, speech synthesis, page
//! generation). The runner hands each executor a point-in-time
//! [`ExecutionSnapshot`] and an [`ExecutionContext`], and merges the
//! returned patch back into the graph store.

// Standard library and external crates
use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

// Internal crate modules
use crate::event_bus::Event;
use crate::node::{CanvasNode, NodeData, NodeDataPatch};

// ============================================================================
// Core Trait
// ============================================================================

/// Core trait defining a generation capability for one canvas node.
///
/// An `Executor` produces fresh content for its node from the node's current
/// payload and the payloads of its direct sources. It returns an optional
/// payload patch; the cascade runner merges the patch into the graph store.
/// A node with no registered executor is simply carried through the cascade
/// unchanged.
///
/// # Contract
///
/// - At most one patch per invocation, by construction: the patch is the
///   return value, and the runner performs the single store write.
/// - Hold no state between invocations; the snapshot is the whole input.
/// - Use [`ExecutionContext::emit`] for anything worth showing in the live
///   event feed.
///
/// # Error Handling
///
/// Returning `Err(ExecutorError)` aborts the whole cascade; the runner clears
/// running markers on the path back out and resets the progress signal. An
/// executor that merely has nothing to produce returns `Ok(None)`.
///
/// # Examples
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use canvasflow::executor::{
///     ExecutionContext, ExecutionSnapshot, Executor, ExecutorError,
/// };
/// use canvasflow::node::{NodeDataPatch, SpeechPatch};
///
/// struct SpeechSynthesisExecutor;
///
/// #[async_trait]
/// impl Executor for SpeechSynthesisExecutor {
///     async fn execute(
///         &self,
///         snapshot: ExecutionSnapshot,
///         ctx: ExecutionContext,
///     ) -> Result<Option<NodeDataPatch>, ExecutorError> {
///         let texts = snapshot.source_texts();
///         if texts.is_empty() {
///             return Err(ExecutorError::MissingInput {
///                 what: "text source for speech synthesis",
///             });
///         }
///         ctx.emit("speech", "synthesizing audio")?;
///
///         let transcript = texts.join("\n");
///         // Call the synthesis provider here; on success hand back a patch.
///         Ok(Some(NodeDataPatch::Speech(SpeechPatch {
///             transcript: Some(transcript),
///             audio_url: Some("https://cdn.example/audio/take-1.mp3".into()),
///             is_rate_limited: None,
///         })))
///     }
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync {
    /// Generate content for the node captured in the snapshot.
    async fn execute(
        &self,
        snapshot: ExecutionSnapshot,
        ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError>;
}

// ============================================================================
// Execution Snapshot
// ============================================================================

/// Point-in-time view of a node and its direct sources, captured right before
/// dispatch.
///
/// The snapshot is read from the graph store after the passthrough pre-step,
/// so text copied along a text-to-text edge is already visible in `sources`.
#[derive(Clone, Debug)]
pub struct ExecutionSnapshot {
    /// The node being generated.
    pub node: CanvasNode,
    /// Direct upstream nodes, in store edge order.
    pub sources: Vec<CanvasNode>,
}

impl ExecutionSnapshot {
    #[must_use]
    pub fn new(node: CanvasNode, sources: Vec<CanvasNode>) -> Self {
        Self { node, sources }
    }

    /// Text content of every text source, in edge order.
    #[must_use]
    pub fn source_texts(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter_map(|source| match &source.data {
                NodeData::Text(data) => Some(data.text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Instruction content of every instruction source, in edge order.
    #[must_use]
    pub fn instructions(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter_map(|source| match &source.data {
                NodeData::Instruction(data) => Some(data.instruction.as_str()),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Execution Context
// ============================================================================

/// Per-dispatch identity handed to an executor alongside the snapshot.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Id of the node being generated.
    pub node_id: String,
    /// Current cascade step number.
    pub step: u64,
    /// Channel for emitting events to the run's event system.
    pub event_bus_sender: flume::Sender<Event>,
}

impl ExecutionContext {
    /// Emit a node-scoped event stamped with this node's id and step, so it
    /// lines up with the runner's own dispatch events in the feed.
    pub fn emit(
        &self,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), ExecutionContextError> {
        self.event_bus_sender
            .send(Event::node_message_with_meta(
                self.node_id.clone(),
                self.step,
                scope,
                message,
            ))
            .map_err(|_| ExecutionContextError::EventBusUnavailable)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure to reach the event system from inside an executor.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutionContextError {
    /// The bus channel is disconnected, usually because the bus was dropped.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(canvasflow::executor::event_bus_unavailable),
        help("The event bus listener may have been stopped. Check runner state.")
    )]
    EventBusUnavailable,
}

/// Errors that can occur during node generation.
///
/// `ExecutorError` represents fatal errors: any of these aborts the cascade
/// and surfaces to the caller of the run.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutorError {
    /// The snapshot lacks content this executor needs.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(canvasflow::executor::missing_input),
        help("Check that the node's upstream sources carry the required content.")
    )]
    MissingInput { what: &'static str },

    /// The generation backend reported a failure.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(canvasflow::executor::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// The provider refused the request on quota grounds.
    #[error("rate limited by provider {provider}")]
    #[diagnostic(
        code(canvasflow::executor::rate_limited),
        help("The node carries an is_rate_limited flag once quota is exhausted; back off before re-running.")
    )]
    RateLimited { provider: &'static str },

    /// Payload JSON could not be produced or parsed.
    #[error(transparent)]
    #[diagnostic(code(canvasflow::executor::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Generated content failed the executor's own checks.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(canvasflow::executor::validation),
        help("Check the node payload format and required fields.")
    )]
    ValidationFailed(String),

    /// Emitting through the context failed.
    #[error("event bus error: {0}")]
    #[diagnostic(code(canvasflow::executor::event_bus))]
    EventBus(#[from] ExecutionContextError),
}
