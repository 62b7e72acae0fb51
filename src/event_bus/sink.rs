use std::io::{self, Result as IoResult, Write};
use std::sync::{Arc, Mutex};

use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;

use super::event::Event;
use crate::telemetry::{PlainFormatter, TelemetryFormatter};

/// An output target for bus events.
///
/// Sinks run on the bus listener task; `handle` should return quickly and
/// report I/O trouble through the `Err` channel rather than panicking.
pub trait EventSink: Sync + Send {
    fn handle(&mut self, event: &Event) -> IoResult<()>;
}

/// Writes each event to stdout through a [`TelemetryFormatter`].
pub struct StdOutSink<F: TelemetryFormatter = PlainFormatter> {
    formatter: F,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self::with_formatter(PlainFormatter::default())
    }
}

impl<F: TelemetryFormatter> StdOutSink<F> {
    pub fn with_formatter(formatter: F) -> Self {
        Self { formatter }
    }
}

impl<F: TelemetryFormatter> EventSink for StdOutSink<F> {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        let text = self.formatter.render_event(event).join_lines();
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

/// Captures events in memory for assertions and snapshots.
///
/// Clones share the same backing buffer, so a test can keep one handle and
/// give the other to the bus.
#[derive(Clone, Default)]
pub struct MemorySink {
    captured: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything captured so far.
    pub fn snapshot(&self) -> Vec<Event> {
        self.captured.lock().unwrap().clone()
    }

    /// Discard everything captured so far.
    pub fn clear(&self) {
        self.captured.lock().unwrap().clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.captured.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Forwards events into a tokio mpsc channel for async consumers.
///
/// Useful for live canvas badges, SSE endpoints, or progress dashboards.
/// Sending never blocks; a dropped receiver surfaces as `BrokenPipe`.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    /// Sink over an existing sender half.
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    /// Create a connected sink/stream pair.
    ///
    /// Attach the sink to an [`EventBus`](super::EventBus) and consume the
    /// stream from UI code. The stream ends once the bus side is dropped;
    /// runs additionally emit a [`STREAM_END_SCOPE`](super::STREAM_END_SCOPE)
    /// diagnostic that consumers can use as an in-band terminator.
    ///
    /// # Example
    /// ```no_run
    /// use futures_util::{StreamExt, pin_mut};
    /// use canvasflow::event_bus::{ChannelSink, EventBus};
    ///
    /// # async fn demo() {
    /// let bus = EventBus::default();
    /// let (sink, events) = ChannelSink::pair();
    /// bus.add_sink(sink);
    /// bus.listen_for_events();
    ///
    /// pin_mut!(events);
    /// while let Some(event) = events.next().await {
    ///     println!("{event}");
    /// }
    /// # }
    /// ```
    pub fn pair() -> (Self, impl Stream<Item = Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), event_stream(rx))
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}

/// Adapt the receiving half of a sink channel into an async `Stream`.
pub fn event_stream(rx: mpsc::UnboundedReceiver<Event>) -> impl Stream<Item = Event> {
    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
}
