//! Outbound side of the consumer engine.
//!
//! The engine hands every dequeued record and every completed latency batch
//! to a [`RecordSink`]. Sinks run on the engine thread, so `on_record` should
//! be cheap; `on_report` only fires at batch boundaries.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use hfmd_core::{Stamped, latency::LatencyReport};
use tracing::info;

/// Consumer of engine output.
pub trait RecordSink<T: Copy>: Send {
    /// Called for every dequeued record, after its latency sample is taken.
    #[inline]
    fn on_record(&mut self, _record: &Stamped<T>) {}

    /// Called once per completed latency batch.
    fn on_report(&mut self, report: &LatencyReport);
}

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Logs each report through `tracing`.
pub struct LogSink {
    label: String,
    cycles_per_ns: Option<f64>,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), cycles_per_ns: None }
    }

    /// Also print nanosecond figures using a calibrated tick rate
    /// (see `hfmd_core::time_util::calibrate_cycles_per_ns`).
    pub fn with_nanos(mut self, cycles_per_ns: f64) -> Self {
        self.cycles_per_ns = Some(cycles_per_ns);
        self
    }
}

impl<T: Copy> RecordSink<T> for LogSink {
    fn on_report(&mut self, report: &LatencyReport) {
        match self.cycles_per_ns {
            Some(rate) => {
                let (min_ns, max_ns, avg_ns) = report.to_nanos(rate);
                info!("[{}] {report} | min={min_ns:.0}ns max={max_ns:.0}ns avg={avg_ns:.1}ns", self.label);
            }
            None => info!("[{}] {report}", self.label),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

/// Forwards reports to another thread over a bounded channel.
///
/// Never blocks the engine: if the receiver falls behind, reports are dropped
/// and counted.
pub struct ChannelSink {
    tx: Sender<LatencyReport>,
    dropped: u64,
}

impl ChannelSink {
    /// Create a sink and the receiver for its reports.
    pub fn bounded(cap: usize) -> (Self, Receiver<LatencyReport>) {
        let (tx, rx) = crossbeam_channel::bounded(cap);
        (Self { tx, dropped: 0 }, rx)
    }

    /// Reports discarded because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<T: Copy> RecordSink<T> for ChannelSink {
    fn on_report(&mut self, report: &LatencyReport) {
        match self.tx.try_send(*report) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.dropped += 1,
            // Nobody is listening any more; reports have nowhere to go.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}
