//! Batched latency window for measuring enqueue-to-dequeue delay.
//!
//! The consumer records one sample per dequeued record: the counter ticks
//! between the producer's stamp and the consumer's read. Samples accumulate in
//! a pre-allocated window of fixed size; when the window fills, min / max /
//! mean are computed over exactly that batch, a [`LatencyReport`] is returned
//! and the window is cleared. Nothing is computed per record beyond the push,
//! so measuring does not perturb what is measured.

use std::fmt;

/// Default number of samples per report.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Statistics for one completed batch, in counter ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyReport {
    /// 1-based index of this batch since the window was created.
    pub batch_seq: u64,
    /// Records processed since the window was created, including this batch.
    pub total_processed: u64,
    /// Samples in this batch.
    pub count: usize,
    pub min_cycles: u64,
    pub max_cycles: u64,
    pub mean_cycles: f64,
}

impl LatencyReport {
    /// Convert tick figures to nanoseconds given a calibrated tick rate.
    ///
    /// Returns `(min_ns, max_ns, mean_ns)`. A non-positive rate is treated as
    /// one tick per nanosecond.
    pub fn to_nanos(&self, cycles_per_ns: f64) -> (f64, f64, f64) {
        let rate = if cycles_per_ns > 0.0 { cycles_per_ns } else { 1.0 };
        (
            self.min_cycles as f64 / rate,
            self.max_cycles as f64 / rate,
            self.mean_cycles / rate,
        )
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch={} processed={} n={} min={}cyc max={}cyc avg={:.1}cyc",
            self.batch_seq, self.total_processed, self.count, self.min_cycles, self.max_cycles, self.mean_cycles,
        )
    }
}

/// Fixed-size sample window.
///
/// Not thread-safe — owned by the consumer thread.
pub struct LatencyWindow {
    samples: Vec<u64>,
    batch_size: usize,
    batches: u64,
    processed: u64,
}

impl LatencyWindow {
    /// Create an empty window that reports every `batch_size` samples.
    ///
    /// A `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self { samples: Vec::with_capacity(batch_size), batch_size, batches: 0, processed: 0 }
    }

    /// Record one latency sample. Returns a report when this sample completes
    /// a batch; the window is empty again afterwards.
    #[inline]
    pub fn record(&mut self, latency_cycles: u64) -> Option<LatencyReport> {
        self.samples.push(latency_cycles);
        self.processed += 1;
        if self.samples.len() < self.batch_size {
            return None;
        }
        let report = self.summarize();
        self.samples.clear();
        Some(report)
    }

    /// Samples currently buffered in the open batch.
    pub fn pending(&self) -> usize {
        self.samples.len()
    }

    /// Total samples recorded, including the open batch.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Drop the open batch without reporting it.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    fn summarize(&mut self) -> LatencyReport {
        self.batches += 1;
        let mut min = u64::MAX;
        let mut max = 0u64;
        let mut sum = 0u128;
        for &s in &self.samples {
            min = min.min(s);
            max = max.max(s);
            sum += s as u128;
        }
        LatencyReport {
            batch_seq: self.batches,
            total_processed: self.processed,
            count: self.samples.len(),
            min_cycles: min,
            max_cycles: max,
            mean_cycles: sum as f64 / self.samples.len() as f64,
        }
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_at_batch_boundary() {
        let mut w = LatencyWindow::new(4);
        assert!(w.record(10).is_none());
        assert!(w.record(20).is_none());
        assert!(w.record(30).is_none());
        let r = w.record(40).unwrap();
        assert_eq!(r.count, 4);
        assert_eq!(r.min_cycles, 10);
        assert_eq!(r.max_cycles, 40);
        assert_eq!(r.mean_cycles, 25.0);
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn each_batch_covers_only_its_own_samples() {
        let mut w = LatencyWindow::new(3);
        let samples = [5, 1, 9, 100, 200, 300, 7, 7, 7, 42];
        let reports: Vec<_> = samples.iter().filter_map(|&s| w.record(s)).collect();

        assert_eq!(reports.len(), 3);
        assert_eq!((reports[0].min_cycles, reports[0].max_cycles), (1, 9));
        assert_eq!(reports[0].mean_cycles, 5.0);
        assert_eq!((reports[1].min_cycles, reports[1].max_cycles), (100, 300));
        assert_eq!(reports[1].mean_cycles, 200.0);
        assert_eq!((reports[2].min_cycles, reports[2].max_cycles), (7, 7));
        assert_eq!(reports.iter().map(|r| r.batch_seq).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(reports[2].total_processed, 9);

        // trailing sample stays in the open batch
        assert_eq!(w.pending(), 1);
        assert_eq!(w.processed(), 10);
    }

    #[test]
    fn zero_batch_reports_every_sample() {
        let mut w = LatencyWindow::new(0);
        assert_eq!(w.batch_size(), 1);
        assert_eq!(w.record(3).unwrap().mean_cycles, 3.0);
    }

    #[test]
    fn mean_does_not_overflow_on_huge_samples() {
        let mut w = LatencyWindow::new(2);
        assert!(w.record(u64::MAX).is_none());
        let r = w.record(u64::MAX).unwrap();
        assert_eq!(r.max_cycles, u64::MAX);
        assert!(r.mean_cycles > 1.8e19);
    }

    #[test]
    fn reset_discards_open_batch() {
        let mut w = LatencyWindow::new(2);
        w.record(1);
        w.reset();
        assert_eq!(w.pending(), 0);
        assert!(w.record(8).is_none());
        let r = w.record(10).unwrap();
        assert_eq!(r.min_cycles, 8);
    }

    #[test]
    fn nanosecond_conversion() {
        let r = LatencyReport {
            batch_seq: 1,
            total_processed: 2,
            count: 2,
            min_cycles: 30,
            max_cycles: 90,
            mean_cycles: 60.0,
        };
        assert_eq!(r.to_nanos(3.0), (10.0, 30.0, 20.0));
        assert_eq!(r.to_nanos(0.0), (30.0, 90.0, 60.0));
    }
}
