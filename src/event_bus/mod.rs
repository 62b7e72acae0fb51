//! Event bus utilities providing fan-out, sinks, and stream consumption.
//!
//! Cascade participants emit [`Event`] values over a shared channel; the
//! [`EventBus`] listener broadcasts each one to every configured
//! [`EventSink`]. [`ChannelSink::pair`] exposes the same flow as an async
//! stream for live UIs.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, NodeEvent, ProgressEvent, STREAM_END_SCOPE};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink, event_stream};
