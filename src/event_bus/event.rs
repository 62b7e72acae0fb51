use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Scope label of the diagnostic event that terminates a live event stream.
pub const STREAM_END_SCOPE: &str = "__canvasflow_stream_end__";

/// A structured occurrence published on the event bus during a cascade run.
///
/// Three sources feed the bus: node-scoped lifecycle messages (dispatch,
/// skips, passthrough copies), progress snapshots for UI badges, and
/// run-level diagnostics such as the stream-end marker.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Node(NodeEvent),
    Progress(ProgressEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    /// Node-scoped message with no node attribution.
    pub fn node_message(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Node(NodeEvent::new(None, None, scope.into(), message.into()))
    }

    /// Node-scoped message attributed to a node at a cascade step.
    pub fn node_message_with_meta(
        node_id: impl Into<String>,
        step: u64,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Node(NodeEvent::new(
            Some(node_id.into()),
            Some(step),
            scope.into(),
            message.into(),
        ))
    }

    /// Progress snapshot for the executing-badge.
    pub fn progress(progress: ProgressEvent) -> Self {
        Event::Progress(progress)
    }

    /// Run-level diagnostic.
    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn scope_label(&self) -> Option<&str> {
        match self {
            Event::Node(node) => Some(node.scope()),
            Event::Progress(_) => Some("progress"),
            Event::Diagnostic(diag) => Some(diag.scope()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Node(node) => node.message(),
            Event::Progress(progress) => progress.summary(),
            Event::Diagnostic(diag) => diag.message(),
        }
    }

    /// Normalized JSON form shared by every variant.
    ///
    /// The envelope is always `{type, scope, message, timestamp, metadata}`;
    /// only `metadata` varies by variant, and absent optional fields are
    /// omitted rather than serialized as null.
    ///
    /// # Example
    ///
    /// ```
    /// use canvasflow::event_bus::Event;
    ///
    /// let event = Event::node_message_with_meta("hero-image", 5, "dispatch", "generating image");
    /// let json = event.to_json_value();
    ///
    /// assert_eq!(json["type"], "node");
    /// assert_eq!(json["scope"], "dispatch");
    /// assert_eq!(json["message"], "generating image");
    /// assert_eq!(json["metadata"]["node_id"], "hero-image");
    /// assert_eq!(json["metadata"]["step"], 5);
    /// ```
    pub fn to_json_value(&self) -> Value {
        let (kind, metadata, timestamp) = match self {
            Event::Node(node) => ("node", node.metadata(), Utc::now()),
            Event::Progress(progress) => ("progress", progress.metadata(), progress.timestamp()),
            Event::Diagnostic(_) => ("diagnostic", Value::Object(Map::new()), Utc::now()),
        };

        json!({
            "type": kind,
            "scope": self.scope_label(),
            "message": self.message(),
            "timestamp": timestamp.to_rfc3339(),
            "metadata": metadata,
        })
    }

    /// Compact JSON string of [`to_json_value`](Event::to_json_value).
    ///
    /// # Example
    ///
    /// ```
    /// use canvasflow::event_bus::Event;
    ///
    /// let event = Event::diagnostic("test", "message");
    /// let json_str = event.to_json_string().unwrap();
    /// assert!(json_str.contains("\"type\":\"diagnostic\""));
    /// ```
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Node(node) => match (node.node_id(), node.step()) {
                (Some(id), Some(step)) => write!(f, "[{id}@{step}] {}", node.message()),
                (Some(id), None) => write!(f, "[{id}] {}", node.message()),
                (None, Some(step)) => write!(f, "[step {step}] {}", node.message()),
                (None, None) => write!(f, "{}", node.message()),
            },
            Event::Progress(progress) => match progress.session_id() {
                Some(session) => write!(f, "[{session}] {}", progress.summary()),
                None => write!(f, "{}", progress.summary()),
            },
            Event::Diagnostic(diag) => write!(f, "{}", diag.message()),
        }
    }
}

/// Lifecycle message attributed to a single node.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeEvent {
    node_id: Option<String>,
    step: Option<u64>,
    scope: String,
    message: String,
}

impl NodeEvent {
    pub fn new(node_id: Option<String>, step: Option<u64>, scope: String, message: String) -> Self {
        Self {
            node_id,
            step,
            scope,
            message,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn step(&self) -> Option<u64> {
        self.step
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn metadata(&self) -> Value {
        let mut meta = Map::new();
        if let Some(node_id) = self.node_id() {
            meta.insert("node_id".into(), json!(node_id));
        }
        if let Some(step) = self.step {
            meta.insert("step".into(), json!(step));
        }
        Value::Object(meta)
    }
}

/// Run-level diagnostic, including the stream-end marker.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    scope: String,
    message: String,
}

impl DiagnosticEvent {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Snapshot of the run-wide progress signal.
///
/// Mirrors exactly what a canvas UI binds to: the executing badge plus an
/// `executed/total` fraction. The total is recomputed every step, so
/// consecutive snapshots of one run may disagree on it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    session_id: Option<String>,
    is_executing: bool,
    total_nodes_for_execution: usize,
    executed_nodes_count: usize,
    summary: String,
    timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        session_id: Option<String>,
        is_executing: bool,
        total_nodes_for_execution: usize,
        executed_nodes_count: usize,
    ) -> Self {
        let summary = if is_executing {
            format!("executing {executed_nodes_count}/{total_nodes_for_execution} nodes")
        } else {
            "execution idle".to_string()
        };
        Self {
            session_id,
            is_executing,
            total_nodes_for_execution,
            executed_nodes_count,
            summary,
            timestamp: Utc::now(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_executing(&self) -> bool {
        self.is_executing
    }

    pub fn total_nodes_for_execution(&self) -> usize {
        self.total_nodes_for_execution
    }

    pub fn executed_nodes_count(&self) -> usize {
        self.executed_nodes_count
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn metadata(&self) -> Value {
        let mut meta = Map::new();
        if let Some(session_id) = self.session_id() {
            meta.insert("session_id".into(), json!(session_id));
        }
        meta.insert("is_executing".into(), json!(self.is_executing));
        meta.insert(
            "total_nodes_for_execution".into(),
            json!(self.total_nodes_for_execution),
        );
        meta.insert(
            "executed_nodes_count".into(),
            json!(self.executed_nodes_count),
        );
        Value::Object(meta)
    }
}
