//! Run-wide progress signal backing the canvas executing badge.
//!
//! The signal is three values: an executing flag, a denominator sized by
//! [`count_reachable`](crate::reachability::count_reachable), and a count of
//! nodes executed so far. The denominator is recomputed at every step, so it
//! can move while a run is in flight. Every change is published to the event
//! bus as a [`ProgressEvent`] for UI consumption.

use serde::{Deserialize, Serialize};

use crate::event_bus::{Event, ProgressEvent};

/// Point-in-time value of the progress signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Whether a cascade run is currently in flight.
    pub is_executing: bool,
    /// Reachable-node denominator, recomputed each step.
    pub total_nodes_for_execution: usize,
    /// Nodes that completed their own execution step so far.
    pub executed_nodes_count: usize,
}

/// Owner of the progress signal for one runner.
///
/// State transitions happen at fixed points of the cascade: [`begin`] when a
/// run starts, [`mark_executing`] and [`set_total`] before each node
/// executes, [`record_executed`] after it, [`finalize_if_complete`] on the
/// way back out of each executed node, and [`reset`]/[`clear_executing`] on
/// the failure and outermost-exit paths. Finalization is idempotent:
/// ancestors re-check it as the traversal unwinds, and only the first check
/// that covers the reachable set fires.
///
/// [`begin`]: ProgressTracker::begin
/// [`mark_executing`]: ProgressTracker::mark_executing
/// [`set_total`]: ProgressTracker::set_total
/// [`record_executed`]: ProgressTracker::record_executed
/// [`finalize_if_complete`]: ProgressTracker::finalize_if_complete
/// [`reset`]: ProgressTracker::reset
/// [`clear_executing`]: ProgressTracker::clear_executing
pub struct ProgressTracker {
    session_id: Option<String>,
    snapshot: ProgressSnapshot,
    sender: flume::Sender<Event>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(session_id: Option<String>, sender: flume::Sender<Event>) -> Self {
        Self {
            session_id,
            snapshot: ProgressSnapshot::default(),
            sender,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.snapshot.is_executing
    }

    /// Start a run: raise the executing flag, zero the executed count, and
    /// seed the denominator.
    pub fn begin(&mut self, total: usize) {
        self.snapshot = ProgressSnapshot {
            is_executing: true,
            total_nodes_for_execution: total,
            executed_nodes_count: 0,
        };
        self.publish();
    }

    /// Raise the executing flag without touching the counters.
    ///
    /// The graph can mutate between a cleanup's coverage check and the next
    /// eligible visit, so a run may keep executing after a finalization has
    /// already fired; each visit re-asserts the flag before dispatching so no
    /// node ever runs behind an idle badge.
    pub fn mark_executing(&mut self) {
        if !self.snapshot.is_executing {
            self.snapshot.is_executing = true;
            self.publish();
        }
    }

    /// Update the denominator with a freshly recomputed reachable count.
    pub fn set_total(&mut self, total: usize) {
        if self.snapshot.total_nodes_for_execution != total {
            self.snapshot.total_nodes_for_execution = total;
            self.publish();
        }
    }

    /// Record one node having completed its own execution step.
    pub fn record_executed(&mut self) {
        self.snapshot.executed_nodes_count += 1;
        self.publish();
    }

    /// Finalize the run once the visited set covers the currently reachable
    /// set: lower the executing flag and zero both counters.
    ///
    /// `covered` counts the visited nodes still inside the reachable set and
    /// `required` is the freshly recomputed reachable count. Both sides come
    /// from the same read of the graph, so a node locked or deleted after
    /// its visit drops out of the comparison entirely and finalization never
    /// fires while a reachable node is still unattempted.
    ///
    /// Idempotent; returns whether this call fired the finalization.
    pub fn finalize_if_complete(&mut self, covered: usize, required: usize) -> bool {
        if self.snapshot.is_executing && covered >= required {
            self.snapshot = ProgressSnapshot::default();
            self.publish();
            return true;
        }
        false
    }

    /// Return the signal to idle after a failed run.
    pub fn reset(&mut self) {
        if self.snapshot != ProgressSnapshot::default() {
            self.snapshot = ProgressSnapshot::default();
            self.publish();
        }
    }

    /// Lower the executing flag without touching the counters.
    ///
    /// The outermost exit of a run calls this unconditionally; when a run
    /// ends without any finalization check (an ineligible start pushes no
    /// cleanup frame), the counters keep their last values but the badge
    /// still goes dark.
    pub fn clear_executing(&mut self) {
        if self.snapshot.is_executing {
            self.snapshot.is_executing = false;
            self.publish();
        }
    }

    fn publish(&self) {
        let event = Event::progress(ProgressEvent::new(
            self.session_id.clone(),
            self.snapshot.is_executing,
            self.snapshot.total_nodes_for_execution,
            self.snapshot.executed_nodes_count,
        ));
        if self.sender.send(event).is_err() {
            tracing::debug!("progress event dropped: event bus unavailable");
        }
    }
}
