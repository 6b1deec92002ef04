//! Consumer engine: drains the ring on a dedicated thread and turns queueing
//! delay into batched latency reports.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped ──start()──► Running ──stop()──► Stopped ──start()──► ...
//! ```
//!
//! `start` moves the consumer half of the ring, the latency window and the
//! sink into a freshly spawned thread. `stop` clears the running flag, joins
//! the thread and takes those parts back, so the engine can be started again.
//! After `stop` returns the thread is gone and nothing touches the ring from
//! this side; records still queued are left where they are.
//!
//! # Poll loop
//!
//! The thread spins on `pop`. A hit stamps the dequeue time and feeds the
//! delta into the window; a miss issues a spin-loop hint and retries. The
//! running flag is checked once per iteration, so at most one extra `pop`
//! happens after a stop request.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
};

use hfmd_core::{
    HfError, Stamped, cpu_affinity,
    latency::{DEFAULT_BATCH_SIZE, LatencyWindow},
    ring::RingConsumer,
    time_util,
};
use tracing::{error, info};

use crate::sink::RecordSink;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Samples per latency report.
    pub stat_batch: usize,
    /// Core to pin the poll thread to. `None` or negative leaves it unpinned.
    pub cpu_core: Option<i32>,
    /// OS thread name, also shown in log lines.
    pub thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { stat_batch: DEFAULT_BATCH_SIZE, cpu_core: None, thread_name: "md-engine".to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

/// Everything the poll thread owns while running.
struct Worker<T: Copy> {
    rx: RingConsumer<Stamped<T>>,
    window: LatencyWindow,
    sink: Box<dyn RecordSink<T>>,
}

/// Drains a ring of [`Stamped`] records on its own thread.
pub struct MarketDataEngine<T: Copy + Send + 'static> {
    config: EngineConfig,
    state: EngineState,
    running: Arc<AtomicBool>,
    processed: Arc<AtomicU64>,
    idle: Option<Worker<T>>,
    handle: Option<JoinHandle<Option<Worker<T>>>>,
}

impl<T: Copy + Send + 'static> MarketDataEngine<T> {
    pub fn new(rx: RingConsumer<Stamped<T>>, config: EngineConfig, sink: impl RecordSink<T> + 'static) -> Self {
        let window = LatencyWindow::new(config.stat_batch);
        Self {
            config,
            state: EngineState::Stopped,
            running: Arc::new(AtomicBool::new(false)),
            processed: Arc::new(AtomicU64::new(0)),
            idle: Some(Worker { rx, window, sink: Box::new(sink) }),
            handle: None,
        }
    }

    /// Spawn the poll thread. Does nothing if already running.
    ///
    /// # Errors
    ///
    /// [`HfError::Engine`] if the OS refuses to spawn the thread, in which
    /// case the engine stays stopped and can be started again, or if an
    /// earlier run panicked and took the ring consumer with it.
    pub fn start(&mut self) -> Result<(), HfError> {
        let builder = thread::Builder::new().name(self.config.thread_name.clone());
        self.start_on(builder)
    }

    fn start_on(&mut self, builder: thread::Builder) -> Result<(), HfError> {
        if self.state == EngineState::Running {
            return Ok(());
        }
        let worker = self
            .idle
            .take()
            .ok_or_else(|| HfError::Engine("ring consumer was lost when a previous run panicked".into()))?;

        // Passed through a slot so a failed spawn can hand the worker back.
        let slot = Arc::new(Mutex::new(Some(worker)));
        let thread_slot = Arc::clone(&slot);

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let processed = Arc::clone(&self.processed);
        let cpu_core = self.config.cpu_core;

        let spawned = builder.spawn(move || {
            let worker = thread_slot.lock().ok().and_then(|mut w| w.take());
            worker.map(|w| poll_loop(w, &running, &processed, cpu_core))
        });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.state = EngineState::Running;
                info!("[{}] engine started", self.config.thread_name);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.idle = slot.lock().ok().and_then(|mut w| w.take());
                error!("[{}] failed to spawn poll thread: {e}", self.config.thread_name);
                Err(HfError::Engine(format!("failed to spawn '{}': {e}", self.config.thread_name)))
            }
        }
    }

    /// Signal the poll thread to exit and wait for it. Safe to call any
    /// number of times.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return;
        };
        match handle.join() {
            Ok(Some(worker)) => self.idle = Some(worker),
            Ok(None) | Err(_) => error!("[{}] poll thread panicked; engine cannot be restarted", self.config.thread_name),
        }
        self.state = EngineState::Stopped;
        info!("[{}] engine stopped, {} records processed", self.config.thread_name, self.processed());
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Records consumed so far. Published at batch boundaries and when the
    /// poll thread exits, so it can lag by up to one batch while running.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

}

impl<T: Copy + Send + 'static> Drop for MarketDataEngine<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop<T: Copy + Send>(
    mut worker: Worker<T>,
    running: &AtomicBool,
    processed: &AtomicU64,
    cpu_core: Option<i32>,
) -> Worker<T> {
    cpu_affinity::maybe_bind(cpu_core);
    info!("polling ring (capacity={}, batch={})", worker.rx.capacity(), worker.window.batch_size());

    while running.load(Ordering::Acquire) {
        match worker.rx.pop() {
            Some(record) => {
                let latency = time_util::cycles_between(record.capture_cycles, time_util::now_cycles());
                worker.sink.on_record(&record);
                if let Some(report) = worker.window.record(latency) {
                    processed.store(report.total_processed, Ordering::Relaxed);
                    worker.sink.on_report(&report);
                }
            }
            None => std::hint::spin_loop(),
        }
    }

    // A partial batch would mix samples across a restart gap.
    let discarded = worker.window.pending();
    worker.window.reset();
    processed.store(worker.window.processed(), Ordering::Relaxed);
    info!(
        "poll loop exited after {} records ({discarded} unreported in open batch)",
        worker.window.processed()
    );
    worker
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use hfmd_core::ring;

    use super::*;
    use crate::{producer::MdProducer, sink::ChannelSink};

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn config(batch: usize) -> EngineConfig {
        EngineConfig { stat_batch: batch, ..EngineConfig::default() }
    }

    /// Collects payloads so tests can check order.
    struct Collect(Arc<Mutex<Vec<u64>>>);

    impl RecordSink<u64> for Collect {
        fn on_record(&mut self, record: &Stamped<u64>) {
            self.0.lock().unwrap().push(record.payload);
        }

        fn on_report(&mut self, _report: &hfmd_core::latency::LatencyReport) {}
    }

    #[test]
    fn start_stop_transitions() {
        let (_tx, rx) = ring::channel::<Stamped<u64>>(8).unwrap();
        let (sink, _reports) = ChannelSink::bounded(8);
        let mut engine = MarketDataEngine::new(rx, config(10), sink);

        assert_eq!(engine.state(), EngineState::Stopped);
        engine.start().unwrap();
        assert!(engine.is_running());
        // idempotent while running
        engine.start().unwrap();
        assert!(engine.is_running());

        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn reports_every_full_batch() {
        let (tx, rx) = ring::channel::<Stamped<u64>>(64).unwrap();
        let mut producer = MdProducer::new(tx);
        let (sink, reports) = ChannelSink::bounded(16);
        let mut engine = MarketDataEngine::new(rx, config(10), sink);
        engine.start().unwrap();

        let mut sent = 0u64;
        while sent < 35 {
            if producer.on_event(&sent) {
                sent += 1;
            }
        }

        let r1 = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        let r2 = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        let r3 = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        for (i, r) in [r1, r2, r3].iter().enumerate() {
            assert_eq!(r.batch_seq, i as u64 + 1);
            assert_eq!(r.count, 10);
            assert_eq!(r.total_processed, (i as u64 + 1) * 10);
            assert!(r.min_cycles <= r.max_cycles);
            assert!(r.min_cycles as f64 <= r.mean_cycles && r.mean_cycles <= r.max_cycles as f64);
        }

        // 5 leftover records never complete a batch
        assert!(wait_until(Duration::from_secs(5), || rx_drained(&producer)));
        assert!(reports.try_recv().is_err());

        engine.stop();
        assert_eq!(engine.processed(), 35);
    }

    fn rx_drained<T: Copy + Send>(producer: &MdProducer<T>) -> bool {
        producer.headroom() == 64
    }

    #[test]
    fn delivers_records_in_fifo_order() {
        let (tx, rx) = ring::channel::<Stamped<u64>>(16).unwrap();
        let mut producer = MdProducer::new(tx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut engine = MarketDataEngine::new(rx, config(100), Collect(Arc::clone(&seen)));
        engine.start().unwrap();

        let mut sent = 0u64;
        while sent < 5_000 {
            if producer.on_event(&sent) {
                sent += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        assert!(wait_until(Duration::from_secs(5), || seen.lock().unwrap().len() == 5_000));
        engine.stop();

        let seen = seen.lock().unwrap();
        assert!(seen.iter().copied().eq(0..5_000));
    }

    #[test]
    fn nothing_is_consumed_after_stop() {
        let (tx, rx) = ring::channel::<Stamped<u64>>(4).unwrap();
        let mut producer = MdProducer::new(tx);
        let stats = producer.stats();
        let (sink, reports) = ChannelSink::bounded(16);
        let mut engine = MarketDataEngine::new(rx, config(1), sink);

        engine.start().unwrap();
        engine.stop();
        let processed = engine.processed();

        // the ring fills and then rejects, nobody drains it
        for i in 0..10u64 {
            producer.on_event(&i);
        }
        thread::sleep(Duration::from_millis(20));
        assert_eq!(stats.published(), 4);
        assert_eq!(stats.dropped(), 6);
        assert_eq!(engine.processed(), processed);
        assert!(reports.try_recv().is_err());
    }

    #[test]
    fn restart_resumes_draining() {
        let (tx, rx) = ring::channel::<Stamped<u64>>(8).unwrap();
        let mut producer = MdProducer::new(tx);
        let (sink, reports) = ChannelSink::bounded(16);
        let mut engine = MarketDataEngine::new(rx, config(4), sink);

        engine.start().unwrap();
        engine.stop();

        for i in 0..4u64 {
            assert!(producer.on_event(&i));
        }
        engine.start().unwrap();
        let r = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(r.count, 4);
        engine.stop();
        assert_eq!(engine.processed(), 4);
    }

    #[test]
    fn drop_joins_the_thread() {
        let (tx, rx) = ring::channel::<Stamped<u64>>(8).unwrap();
        let (sink, reports) = ChannelSink::bounded(1);
        {
            let mut engine = MarketDataEngine::new(rx, config(1), sink);
            engine.start().unwrap();
        }
        // engine (and its sink) are gone once drop returns
        assert!(reports.recv_timeout(Duration::from_millis(100)).is_err());
        assert!(reports.is_empty());
        drop(tx);
    }

    #[test]
    #[cfg(all(target_os = "linux", target_env = "gnu", target_pointer_width = "64"))]
    fn failed_spawn_keeps_the_consumer() {
        let (tx, rx) = ring::channel::<Stamped<u64>>(8).unwrap();
        let mut producer = MdProducer::new(tx);
        let (sink, reports) = ChannelSink::bounded(4);
        let mut engine = MarketDataEngine::new(rx, config(2), sink);

        // no stack this large can be mapped, so pthread_create fails
        let unspawnable = thread::Builder::new().stack_size(usize::MAX / 4);
        assert!(matches!(engine.start_on(unspawnable), Err(HfError::Engine(_))));
        assert_eq!(engine.state(), EngineState::Stopped);

        engine.start().unwrap();
        assert!(producer.on_event(&1));
        assert!(producer.on_event(&2));
        let r = reports.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(r.count, 2);
        engine.stop();
        assert_eq!(engine.processed(), 2);
    }

    #[test]
    fn bad_core_id_is_not_fatal() {
        let (_tx, rx) = ring::channel::<Stamped<u64>>(8).unwrap();
        let (sink, _reports) = ChannelSink::bounded(1);
        let cfg = EngineConfig { cpu_core: Some(i32::MAX), ..config(1) };
        let mut engine = MarketDataEngine::new(rx, cfg, sink);
        engine.start().unwrap();
        assert!(engine.is_running());
        engine.stop();
    }
}
