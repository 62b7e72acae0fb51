//! Terminal rendering for bus events.
//!
//! Sinks that write to a terminal go through a [`TelemetryFormatter`] so the
//! same event feed can come out colored on a TTY and bare in a log file.

use std::io::IsTerminal;

use crate::event_bus::Event;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta / dark pink
pub const RESET_COLOR: &str = "\x1b[0m";

/// Whether rendered output carries ANSI color codes.
///
/// `Auto` checks `stderr` on every use, so a formatter built once keeps
/// doing the right thing when output is redirected mid-process. Use
/// `Colored` or `Plain` to pin the behavior regardless of the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatterMode {
    /// Follow `stderr.is_terminal()`.
    #[default]
    Auto,
    /// Force ANSI codes on.
    Colored,
    /// Force ANSI codes off.
    Plain,
}

impl FormatterMode {
    /// Resolve `Auto` into a pinned mode based on the current `stderr`.
    pub fn auto_detect() -> Self {
        if FormatterMode::Auto.is_colored() {
            FormatterMode::Colored
        } else {
            FormatterMode::Plain
        }
    }

    /// True when this mode should emit color right now.
    pub fn is_colored(&self) -> bool {
        match self {
            FormatterMode::Auto => std::io::stderr().is_terminal(),
            FormatterMode::Colored => true,
            FormatterMode::Plain => false,
        }
    }
}

/// One formatted event, ready for a sink to write.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    pub fn join_lines(&self) -> String {
        self.lines.concat()
    }
}

/// Turns an [`Event`] into writable text.
pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &Event) -> EventRender;
}

/// Single-line formatter over each event's `Display` form.
///
/// Progress snapshots render in [`CONTEXT_COLOR`] so the executing badge
/// stands out in a scrolling feed; node and diagnostic lines use
/// [`LINE_COLOR`].
///
/// # Examples
/// ```
/// use canvasflow::telemetry::{FormatterMode, PlainFormatter};
///
/// // Auto-detect TTY
/// let formatter = PlainFormatter::new();
///
/// // Force plain output for log capture
/// let formatter = PlainFormatter::with_mode(FormatterMode::Plain);
/// ```
pub struct PlainFormatter {
    mode: FormatterMode,
}

impl PlainFormatter {
    pub fn new() -> Self {
        Self::with_mode(FormatterMode::Auto)
    }

    pub fn with_mode(mode: FormatterMode) -> Self {
        Self { mode }
    }

    fn line_color(&self, event: &Event) -> &'static str {
        match event {
            Event::Progress(_) => CONTEXT_COLOR,
            _ => LINE_COLOR,
        }
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> EventRender {
        let mut line = if self.mode.is_colored() {
            format!("{}{event}{RESET_COLOR}", self.line_color(event))
        } else {
            event.to_string()
        };
        line.push('\n');
        EventRender {
            context: event.scope_label().map(str::to_string),
            lines: vec![line],
        }
    }
}
