use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single streamed answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: u64,
    pub bytes: u64,
    pub frames: u64,
    pub malformed_frames: u64,
    pub deltas: u64,
}

impl std::fmt::Display for StreamStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} chunks ({} bytes), {} frames ({} malformed), {} deltas",
            self.chunks, self.bytes, self.frames, self.malformed_frames, self.deltas
        )
    }
}

/// Turn outcome counters for one controller
#[derive(Default)]
pub struct ControllerMetrics {
    /// Turns whose stream ran to end of body
    pub completed_turns: AtomicU64,

    /// Turns stopped by the user
    pub cancelled_turns: AtomicU64,

    /// Turns ended by a transport or upstream failure
    pub failed_turns: AtomicU64,

    /// Submits ignored because another turn was in flight
    pub rejected_submits: AtomicU64,

    /// Frames dropped because their payload was not valid JSON
    pub malformed_frames: AtomicU64,
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completed(&self, stats: &StreamStats) {
        self.completed_turns.fetch_add(1, Ordering::Relaxed);
        self.record_stream(stats);
    }

    pub fn record_cancelled(&self, stats: &StreamStats) {
        self.cancelled_turns.fetch_add(1, Ordering::Relaxed);
        self.record_stream(stats);
    }

    pub fn record_failed(&self, stats: &StreamStats) {
        self.failed_turns.fetch_add(1, Ordering::Relaxed);
        self.record_stream(stats);
    }

    pub fn record_rejected(&self) {
        self.rejected_submits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_stream(&self, stats: &StreamStats) {
        self.malformed_frames
            .fetch_add(stats.malformed_frames, Ordering::Relaxed);
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            completed_turns: self.completed_turns.load(Ordering::Relaxed),
            cancelled_turns: self.cancelled_turns.load(Ordering::Relaxed),
            failed_turns: self.failed_turns.load(Ordering::Relaxed),
            rejected_submits: self.rejected_submits.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub completed_turns: u64,
    pub cancelled_turns: u64,
    pub failed_turns: u64,
    pub rejected_submits: u64,
    pub malformed_frames: u64,
}

impl MetricsSnapshot {
    pub fn total_turns(&self) -> u64 {
        self.completed_turns + self.cancelled_turns + self.failed_turns
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Turns: {} ({} completed, {} cancelled, {} failed), {} rejected submits, {} malformed frames",
            self.total_turns(),
            self.completed_turns,
            self.cancelled_turns,
            self.failed_turns,
            self.rejected_submits,
            self.malformed_frames
        )
    }
}
