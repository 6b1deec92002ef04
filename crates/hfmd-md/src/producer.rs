//! Callback-side producer adapter.
//!
//! [`MdProducer`] lives on the thread that delivers market data (a vendor SDK
//! I/O thread, or [`crate::sim_feed::SimulatedFeed`]). For every event it reads
//! the cycle counter once, copies the payload into a stack-local
//! [`Stamped`] record and makes exactly one `push` attempt. A full ring drops
//! the record. Between the counter read and the return of `push` there is no
//! allocation, no logging and no lock.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use hfmd_core::{
    Stamped,
    ring::RingProducer,
    time_util,
};

/// Counters exposed to the control thread.
///
/// Only the producer thread writes them, so updates are plain relaxed
/// load/store pairs instead of read-modify-write instructions.
#[derive(Debug, Default)]
pub struct ProducerStats {
    published: AtomicU64,
    dropped: AtomicU64,
}

impl ProducerStats {
    /// Records successfully pushed.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Records discarded because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline(always)]
    fn bump(counter: &AtomicU64) {
        counter.store(counter.load(Ordering::Relaxed) + 1, Ordering::Relaxed);
    }
}

/// Stamps and enqueues inbound events.
pub struct MdProducer<T: Copy> {
    tx: RingProducer<Stamped<T>>,
    stats: Arc<ProducerStats>,
}

impl<T: Copy + Send> MdProducer<T> {
    pub fn new(tx: RingProducer<Stamped<T>>) -> Self {
        Self { tx, stats: Arc::new(ProducerStats::default()) }
    }

    /// Handle one inbound event. Returns `false` if the record was dropped
    /// because the ring is full.
    #[inline(always)]
    pub fn on_event(&mut self, payload: &T) -> bool {
        let record = Stamped::new(*payload, time_util::now_cycles());
        if self.tx.push(record) {
            ProducerStats::bump(&self.stats.published);
            true
        } else {
            ProducerStats::bump(&self.stats.dropped);
            false
        }
    }

    /// Shareable handle on this producer's counters.
    pub fn stats(&self) -> Arc<ProducerStats> {
        Arc::clone(&self.stats)
    }

    /// Free slots observed right now. Racy; for monitoring only.
    pub fn headroom(&self) -> usize {
        self.tx.capacity() - self.tx.len()
    }
}
