//! Reusable test executors for cascade integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use canvasflow::executor::{ExecutionContext, ExecutionSnapshot, Executor, ExecutorError};
use canvasflow::node::{NodeDataPatch, SpeechPatch};

/// Executor that records each invocation and produces no patch.
///
/// Clones share one invocation log, so a single instance can be registered
/// for several nodes and inspected after the run.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    invocations: Arc<Mutex<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node ids this executor ran for, in dispatch order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(
        &self,
        snapshot: ExecutionSnapshot,
        _ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        self.invocations.lock().unwrap().push(snapshot.node.id);
        Ok(None)
    }
}

/// Executor that always fails with a provider error.
#[derive(Clone)]
pub struct FailingExecutor {
    pub message: &'static str,
}

impl Default for FailingExecutor {
    fn default() -> Self {
        Self {
            message: "synthesis backend unavailable",
        }
    }
}

#[async_trait]
impl Executor for FailingExecutor {
    async fn execute(
        &self,
        _snapshot: ExecutionSnapshot,
        _ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        Err(ExecutorError::Provider {
            provider: "test",
            message: self.message.to_string(),
        })
    }
}

/// Executor that returns a fixed patch on every invocation.
pub struct PatchingExecutor {
    pub patch: NodeDataPatch,
}

impl PatchingExecutor {
    pub fn new(patch: NodeDataPatch) -> Self {
        Self { patch }
    }
}

#[async_trait]
impl Executor for PatchingExecutor {
    async fn execute(
        &self,
        _snapshot: ExecutionSnapshot,
        _ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        Ok(Some(self.patch.clone()))
    }
}

/// Executor standing in for a speech provider: joins its text sources into
/// a transcript patch and emits a progress message through the context.
pub struct TranscribingExecutor;

#[async_trait]
impl Executor for TranscribingExecutor {
    async fn execute(
        &self,
        snapshot: ExecutionSnapshot,
        ctx: ExecutionContext,
    ) -> Result<Option<NodeDataPatch>, ExecutorError> {
        let texts = snapshot.source_texts();
        if texts.is_empty() {
            return Err(ExecutorError::MissingInput {
                what: "text source for transcription",
            });
        }
        ctx.emit("speech", "transcribing sources")?;
        Ok(Some(NodeDataPatch::Speech(SpeechPatch {
            transcript: Some(texts.join("\n")),
            audio_url: None,
            is_rate_limited: None,
        })))
    }
}
