//! # Streaming Progress Example
//!
//! This example demonstrates how to stream cascade events live using
//! [`ChannelSink::pair`]. This pattern is the foundation for real-time canvas
//! badges, SSE endpoints, or WebSocket connections.
//!
//! ## What This Example Shows
//!
//! 1. **Creating a stream** - `ChannelSink::pair()` gives a sink plus stream
//! 2. **Wiring the runner** - `CascadeRunner::with_config_and_bus`
//! 3. **Running in the background** - while the stream is consumed live
//! 4. **Terminating cleanly** - via the in-band stream-end diagnostic
//!
//! ## Run This Example
//!
//! ```bash
//! cargo run --example streaming_progress
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{StreamExt, pin_mut};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use canvasflow::event_bus::{ChannelSink, Event, EventBus, STREAM_END_SCOPE};
use canvasflow::node::{CanvasEdge, CanvasNode};
use canvasflow::registry::CapabilityRegistry;
use canvasflow::runtimes::{CascadeRunner, RuntimeConfig};
use canvasflow::store::InMemoryGraphStore;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive("canvasflow=info".parse().unwrap())
                .add_directive("streaming_progress=info".parse().unwrap()),
        )
        .with(ErrorLayer::default())
        .init();
}

fn init_miette() {
    miette::set_panic_hook();
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    init_tracing();
    init_miette();

    info!("=== Streaming Progress Example ===\n");

    // 1. Build a small canvas: a brief fanning out into two branches.
    info!("Building the canvas...");
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text("brief", "Launch week announcement"))
            .with_node(CanvasNode::text("headline", ""))
            .with_node(CanvasNode::text("social-post", ""))
            .with_node(CanvasNode::text("summary", ""))
            .with_edge(CanvasEdge::between("brief", "headline"))
            .with_edge(CanvasEdge::between("brief", "social-post"))
            .with_edge(CanvasEdge::between("headline", "summary")),
    );

    // 2. Create the stream (one per client/request in production) and a bus
    //    carrying only the streaming sink.
    info!("Setting up the event stream...\n");
    let (sink, events) = ChannelSink::pair();
    let bus = EventBus::with_sink(sink);

    // A visible settle delay so the progress counts arrive one by one.
    let config = RuntimeConfig::new(
        Some("stream-demo-session".into()),
        Some(Duration::from_millis(150)),
    );

    // 3. Run the cascade in the background with the custom bus. The runner
    //    (and its bus) stay alive until after the stream is drained.
    let run_task = tokio::spawn(async move {
        let mut runner = CascadeRunner::with_config_and_bus(
            store,
            CapabilityRegistry::new(),
            config,
            bus,
            true,
        );
        let outcome = runner.run("brief").await;
        (runner, outcome)
    });

    // 4. Consume streamed events as they arrive. The run closes the stream
    //    with an in-band diagnostic, so the loop knows when to stop.
    info!("📡 Streaming events (these could feed an SSE endpoint):\n");
    pin_mut!(events);
    while let Some(event) = events.next().await {
        if event.scope_label() == Some(STREAM_END_SCOPE) {
            info!("🏁 Stream terminated: {}", event.message());
            break;
        }
        match &event {
            Event::Progress(progress) => info!("📨 Progress: {}", progress.summary()),
            other => info!("📨 {other}"),
        }
    }

    let (_runner, outcome) = run_task.await.expect("run task joined");
    let report = outcome?;
    info!("\n✅ Cascade finished: {:?}", report.executed_nodes);
    info!("\n=== Example Complete ===");
    Ok(())
}
