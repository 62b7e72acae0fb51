//! # Canvasflow: Cascade Execution for Canvas Workflow Graphs
//!
//! Canvasflow drives generation cascades over a canvas of typed nodes: the
//! user runs one node, and execution flows along the edges, producing text,
//! images, speech, and pages from each node's upstream sources.
//!
//! ## Core Concepts
//!
//! - **Nodes**: typed canvas items (text, image, speech, instruction,
//!   comment, website), each with its own payload shape plus `locked` and
//!   `running` flags
//! - **Edges**: directed connections; store order is execution order
//! - **Graph Store**: the authoritative, concurrently editable home of the
//!   graph, re-read at every step of a run
//! - **Executors**: pluggable async capabilities registered per node
//! - **Cascade Runner**: depth-first traversal with at-most-once execution,
//!   cycle protection, and a live progress signal
//!
//! ## Quick Start
//!
//! ### Building a Canvas
//!
//! ```
//! use canvasflow::node::{CanvasEdge, CanvasNode};
//! use canvasflow::store::InMemoryGraphStore;
//!
//! let store = InMemoryGraphStore::new()
//!     .with_node(CanvasNode::text("brief", "A rooftop at dusk"))
//!     .with_node(CanvasNode::image("hero", "cinematic wide shot"))
//!     .with_edge(CanvasEdge::between("brief", "hero"));
//! ```
//!
//! ### Running a Cascade
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use canvasflow::executor::{ExecutionContext, ExecutionSnapshot, Executor, ExecutorError};
//! use canvasflow::node::{CanvasEdge, CanvasNode, ImagePatch, NodeDataPatch};
//! use canvasflow::registry::CapabilityRegistry;
//! use canvasflow::runtimes::CascadeRunner;
//! use canvasflow::store::InMemoryGraphStore;
//! use canvasflow::types::NodeKind;
//!
//! struct ImageGen;
//!
//! #[async_trait]
//! impl Executor for ImageGen {
//!     async fn execute(
//!         &self,
//!         snapshot: ExecutionSnapshot,
//!         ctx: ExecutionContext,
//!     ) -> Result<Option<NodeDataPatch>, ExecutorError> {
//!         ctx.emit("image", "rendering from prompt")?;
//!         let prompt = snapshot.source_texts().join("\n");
//!         Ok(Some(NodeDataPatch::Image(ImagePatch {
//!             prompt: Some(prompt),
//!             image_url: Some("https://cdn.example/hero.png".into()),
//!             is_rate_limited: None,
//!         })))
//!     }
//! }
//!
//! # async fn example() -> miette::Result<()> {
//! let store = Arc::new(
//!     InMemoryGraphStore::new()
//!         .with_node(CanvasNode::text("brief", "A rooftop at dusk"))
//!         .with_node(CanvasNode::image("hero", ""))
//!         .with_edge(CanvasEdge::between("brief", "hero")),
//! );
//! let registry =
//!     CapabilityRegistry::new().with_executor("hero", NodeKind::Image, Arc::new(ImageGen));
//!
//! let mut runner = CascadeRunner::new(store, registry);
//! let report = runner.run("brief").await?;
//! assert_eq!(report.executed_nodes, vec!["brief", "hero"]);
//! # Ok(())
//! # }
//! ```
//!
//! ### Eligibility and Reachability
//!
//! ```
//! use canvasflow::node::{CanvasEdge, CanvasNode};
//! use canvasflow::reachability::count_reachable;
//! use canvasflow::sources::Eligibility;
//!
//! let nodes = vec![
//!     CanvasNode::text("a", "start"),
//!     CanvasNode::text("b", "").with_locked(true),
//! ];
//! let edges = vec![CanvasEdge::between("a", "b")];
//!
//! // Locked nodes are skipped and fenced out of the progress total.
//! assert_eq!(Eligibility::assess(&nodes[1], &edges), Eligibility::Locked);
//! assert_eq!(count_reachable("a", &nodes, &edges), 1);
//! ```
//!
//! ## Module Guide
//!
//! - [`node`] - canvas nodes, edges, typed payloads, and merge patches
//! - [`store`] - the graph store trait and the in-memory implementation
//! - [`executor`] - the executor trait, snapshots, and execution errors
//! - [`registry`] - per-node capability registration with checked lookup
//! - [`sources`] - connectivity, direct sources, and eligibility
//! - [`reachability`] - the reachable count behind the progress denominator
//! - [`runtimes`] - the cascade runner, its configuration, and progress
//! - [`event_bus`] - event fan-out to sinks and live streams
//! - [`telemetry`] - event formatting for terminal output

pub mod event_bus;
pub mod executor;
pub mod node;
pub mod reachability;
pub mod registry;
pub mod runtimes;
pub mod sources;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod utils;
