//! Cascade runtime: the runner, its configuration, and the progress signal.
//!
//! This module hosts the execution side of the crate. The graph itself lives
//! in the [`store`](crate::store); the runtime layer drives cascades over it
//! and reports what happened.
//!
//! # Architecture
//!
//! - **[`CascadeRunner`]** - orchestrates a depth-first cascade over the graph
//! - **[`RuntimeConfig`]** - session identity, settle timing, and event sinks
//! - **[`ProgressTracker`]** - the run-wide executing signal behind UI badges
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use canvasflow::node::{CanvasEdge, CanvasNode};
//! use canvasflow::registry::CapabilityRegistry;
//! use canvasflow::runtimes::CascadeRunner;
//! use canvasflow::store::InMemoryGraphStore;
//!
//! # async fn example() -> miette::Result<()> {
//! let store = Arc::new(
//!     InMemoryGraphStore::new()
//!         .with_node(CanvasNode::text("brief", "A rooftop at dusk"))
//!         .with_node(CanvasNode::image("hero", "cinematic shot"))
//!         .with_edge(CanvasEdge::between("brief", "hero")),
//! );
//!
//! let mut runner = CascadeRunner::new(store, CapabilityRegistry::new());
//! let report = runner.run("brief").await?;
//! println!("executed {:?}", report.executed_nodes);
//! # Ok(())
//! # }
//! ```

pub mod progress;
pub mod runner;
pub mod runtime_config;

pub use progress::{ProgressSnapshot, ProgressTracker};
pub use runner::{CascadeReport, CascadeRunner, RunnerError, SkippedNode};
pub use runtime_config::{EventBusConfig, RuntimeConfig, SinkConfig};
