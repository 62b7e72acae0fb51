use std::time::Duration;

use crate::event_bus::{EventBus, EventSink, MemorySink, StdOutSink};
use crate::utils::id_generator;

/// Milliseconds a node waits before executing when no override is set.
const DEFAULT_SETTLE_MS: u64 = 50;

/// Per-runner configuration: session identity, settle timing, and event
/// sink wiring.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Identity of the canvas session a run belongs to. Runs refuse to start
    /// without one.
    pub session_id: Option<String>,
    /// Pause inserted before each node executes, letting patches from the
    /// previous step settle into the graph store.
    pub settle_delay: Duration,
    pub event_bus: EventBusConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session_id: Some(id_generator::IdGenerator::new().generate_session_id()),
            settle_delay: Self::resolve_settle_delay(None),
            event_bus: EventBusConfig::default(),
        }
    }
}

impl RuntimeConfig {
    fn resolve_settle_delay(provided: Option<Duration>) -> Duration {
        if let Some(delay) = provided {
            return delay;
        }
        dotenvy::dotenv().ok();
        std::env::var("CANVASFLOW_SETTLE_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(DEFAULT_SETTLE_MS))
    }

    pub fn new(session_id: Option<String>, settle_delay: Option<Duration>) -> Self {
        Self {
            session_id,
            settle_delay: Self::resolve_settle_delay(settle_delay),
            event_bus: EventBusConfig::default(),
        }
    }

    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBusConfig) -> Self {
        self.event_bus = event_bus;
        self
    }

    #[must_use]
    pub fn with_stdout_event_bus(self) -> Self {
        self.with_event_bus(EventBusConfig::with_stdout_only())
    }

    #[must_use]
    pub fn with_memory_event_bus(self) -> Self {
        self.with_event_bus(EventBusConfig::with_memory_sink())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkConfig {
    StdOut,
    Memory,
}

#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub sinks: Vec<SinkConfig>,
}

impl EventBusConfig {
    #[must_use]
    pub fn new(sinks: Vec<SinkConfig>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self::new(vec![SinkConfig::StdOut])
    }

    #[must_use]
    pub fn with_memory_sink() -> Self {
        Self::new(vec![SinkConfig::StdOut, SinkConfig::Memory])
    }

    #[must_use]
    pub fn add_sink(mut self, sink: SinkConfig) -> Self {
        if !self.sinks.contains(&sink) {
            self.sinks.push(sink);
        }
        self
    }

    pub fn sinks(&self) -> &[SinkConfig] {
        &self.sinks
    }

    /// Materialize an [`EventBus`] carrying the configured sinks.
    ///
    /// An empty sink list falls back to stdout so events are never silently
    /// dropped.
    #[must_use]
    pub fn build_event_bus(&self) -> EventBus {
        if self.sinks.is_empty() {
            return EventBus::with_sink(StdOutSink::default());
        }
        let sinks: Vec<Box<dyn EventSink>> = self
            .sinks
            .iter()
            .map(|sink| match sink {
                SinkConfig::StdOut => Box::new(StdOutSink::default()) as Box<dyn EventSink>,
                SinkConfig::Memory => Box::new(MemorySink::new()) as Box<dyn EventSink>,
            })
            .collect();
        EventBus::with_sinks(sinks)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}
