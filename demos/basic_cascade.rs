//! Basic Cascade: Building and Running a Canvas
//!
//! This demonstration showcases the fundamental canvas building and cascade
//! execution patterns in canvasflow. It covers typed node construction,
//! executor registration, and a full run with its report.
//!
//! What You'll Learn:
//! 1. Canvas Construction: Typed nodes and edges in an `InMemoryGraphStore`
//! 2. Executors: Implementing the `Executor` trait for image and speech nodes
//! 3. Registration: Binding executors to nodes through `CapabilityRegistry`
//! 4. Running: Driving a cascade with `CascadeRunner` and reading its report
//! 5. Skips: How locked nodes fence off their subtree without erroring
//!
//! Running This Demo:
//! ```bash
//! cargo run --example basic_cascade
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use miette::Result;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use canvasflow::executor::{ExecutionContext, ExecutionSnapshot, Executor, ExecutorError};
use canvasflow::node::{CanvasEdge, CanvasNode, ImagePatch, NodeData, NodeDataPatch, SpeechPatch};
use canvasflow::registry::CapabilityRegistry;
use canvasflow::runtimes::CascadeRunner;
use canvasflow::store::{GraphStore, InMemoryGraphStore};
use canvasflow::types::NodeKind;

/// Mock image generation: assembles a prompt from the node's sources and
/// pretends a provider rendered it.
struct ImageGenerator;

#[async_trait]
impl Executor for ImageGenerator {
    async fn execute(
        &self,
        snapshot: ExecutionSnapshot,
        ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        let prompt = snapshot.source_texts().join("; ");
        if prompt.is_empty() {
            return Err(ExecutorError::MissingInput {
                what: "text source for the image prompt",
            });
        }
        ctx.emit("image", format!("rendering from prompt: {prompt}"))?;

        // A real executor would call its provider here.
        Ok(Some(NodeDataPatch::Image(ImagePatch {
            prompt: Some(prompt),
            image_url: Some("https://cdn.example/render/hero.png".into()),
            is_rate_limited: None,
        })))
    }
}

/// Mock speech synthesis: joins upstream text into a transcript.
struct SpeechSynthesizer;

#[async_trait]
impl Executor for SpeechSynthesizer {
    async fn execute(
        &self,
        snapshot: ExecutionSnapshot,
        ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        let transcript = snapshot.source_texts().join("\n");
        ctx.emit("speech", "synthesizing voiceover")?;

        Ok(Some(NodeDataPatch::Speech(SpeechPatch {
            transcript: Some(transcript),
            audio_url: Some("https://cdn.example/audio/voiceover.mp3".into()),
            is_rate_limited: None,
        })))
    }
}

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        // Log when spans are created/closed so we see instrumented async boundaries
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("error,canvasflow=error"))
        .unwrap();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
}

fn init_miette() {
    // Pretty panic reports
    miette::set_panic_hook();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_miette();
    demo().await
}

async fn demo() -> Result<()> {
    info!("\n╔══════════════════════════════════════════════════════════╗");
    info!("║                     Basic Cascade                        ║");
    info!("║           Canvas Building & Cascade Execution            ║");
    info!("╚══════════════════════════════════════════════════════════╝\n");

    // Step 1: Build the canvas. A text brief feeds an image node and a
    // speech node; a side note is locked and stays untouched.
    info!("📊 Step 1: Building the canvas");
    let store = Arc::new(
        InMemoryGraphStore::new()
            .with_node(CanvasNode::text(
                "brief",
                "A rocket lifting off over the bay at dawn",
            ))
            .with_node(CanvasNode::image("hero", ""))
            .with_node(CanvasNode::speech("voiceover", ""))
            .with_node(CanvasNode::text("alt-take", "An older draft").with_locked(true))
            .with_edge(CanvasEdge::between("brief", "hero"))
            .with_edge(CanvasEdge::between("brief", "voiceover"))
            .with_edge(CanvasEdge::between("brief", "alt-take")),
    );

    // Step 2: Register executors for the generated nodes. The brief itself
    // carries none and is simply carried through.
    info!("🔌 Step 2: Registering executors");
    let registry = CapabilityRegistry::new()
        .with_executor("hero", NodeKind::Image, Arc::new(ImageGenerator))
        .with_executor("voiceover", NodeKind::Speech, Arc::new(SpeechSynthesizer));

    // Step 3: Run the cascade from the brief.
    info!("🚀 Step 3: Running the cascade\n");
    let mut runner = CascadeRunner::new(store.clone(), registry);
    let report = runner.run("brief").await?;

    info!("\n✅ Cascade complete");
    info!("   session:  {}", report.session_id);
    info!("   steps:    {}", report.steps);
    info!("   executed: {:?}", report.executed_nodes);
    for skipped in &report.skipped_nodes {
        info!("   skipped:  {} ({})", skipped.node_id, skipped.reason);
    }

    // Step 4: Inspect what the executors produced.
    info!("\n🖼  Step 4: Generated payloads");
    let hero = store.get_node("hero").await?;
    if let NodeData::Image(image) = &hero.data {
        info!("   hero prompt: {}", image.prompt);
        info!("   hero url:    {}", image.image_url.as_deref().unwrap_or("-"));
    }
    let voiceover = store.get_node("voiceover").await?;
    if let NodeData::Speech(speech) = &voiceover.data {
        info!("   voiceover transcript: {}", speech.transcript);
    }

    info!("\n=== Demo Complete ===");
    Ok(())
}
