//! Synthetic depth feed.
//!
//! Plays the part of a vendor market data SDK: a thread of its own that fires
//! one callback per depth update into an [`MdProducer`]. Snapshots cycle
//! round-robin over the configured instruments with a deterministic price
//! walk, so runs are reproducible. No network I/O.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use hfmd_core::{
    DEPTH_LEVELS, DepthMarketData, HfError, cpu_affinity, id_to_bytes,
    time_util,
};
use tracing::{error, info};

use crate::producer::MdProducer;

/// Price grid step used by the synthetic walk.
const TICK_SIZE: f64 = 0.5;

/// The walk oscillates within +/- this many ticks of the base price.
const WALK_SPAN: u64 = 20;

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub instruments: Vec<String>,
    pub exchange_id: String,
    /// Events per second across all instruments; 0 means unpaced.
    pub rate_per_sec: u64,
    pub cpu_core: Option<i32>,
    /// Stop by itself after this many events.
    pub max_events: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            instruments: vec!["au2512".to_string()],
            exchange_id: "SHFE".to_string(),
            rate_per_sec: 1_000,
            cpu_core: None,
            max_events: None,
        }
    }
}

/// Handle on a running feed thread.
pub struct SimulatedFeed {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
    emitted: u64,
}

impl SimulatedFeed {
    /// Start emitting into `producer` on a new thread named `md-feed`.
    pub fn spawn(mut producer: MdProducer<DepthMarketData>, config: FeedConfig) -> Result<Self, HfError> {
        if config.instruments.is_empty() {
            return Err(HfError::Config("simulated feed needs at least one instrument".into()));
        }
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("md-feed".to_string())
            .spawn(move || {
                cpu_affinity::maybe_bind(config.cpu_core);
                run_feed(&mut producer, &config, &flag)
            })
            .map_err(|e| HfError::Engine(format!("failed to spawn feed thread: {e}")))?;

        Ok(Self { running, handle: Some(handle), emitted: 0 })
    }

    /// True once the thread has exited (stopped or hit `max_events`).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stop the thread and return the number of events it emitted.
    pub fn stop(&mut self) -> u64 {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(emitted) => self.emitted = emitted,
                Err(_) => error!("feed thread panicked; emitted count unknown"),
            }
        }
        self.emitted
    }
}

impl Drop for SimulatedFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_feed(producer: &mut MdProducer<DepthMarketData>, config: &FeedConfig, running: &AtomicBool) -> u64 {
    let mut books: Vec<DepthMarketData> = config
        .instruments
        .iter()
        .enumerate()
        .map(|(i, sym)| seed_snapshot(sym, &config.exchange_id, 400.0 + 100.0 * i as f64))
        .collect();

    let interval = (config.rate_per_sec > 0).then(|| Duration::from_nanos(1_000_000_000 / config.rate_per_sec));
    let limit = config.max_events.unwrap_or(u64::MAX);
    let mut next_due = Instant::now();
    let mut seq = 0u64;

    info!(
        "feed started: {} instrument(s), rate={}/s",
        books.len(),
        config.rate_per_sec
    );

    while seq < limit && running.load(Ordering::Acquire) {
        if let Some(step) = interval {
            let now = Instant::now();
            if next_due > now {
                thread::sleep(next_due - now);
            }
            next_due += step;
        }

        let n = books.len();
        let book = &mut books[(seq % n as u64) as usize];
        advance(book, seq / n as u64);
        producer.on_event(book);
        seq += 1;
    }

    info!("feed stopped after {seq} events");
    seq
}

fn seed_snapshot(instrument: &str, exchange: &str, base: f64) -> DepthMarketData {
    let mut md = DepthMarketData::new(instrument, exchange);
    md.pre_settlement_price = base;
    md.pre_close_price = base;
    md.open_price = base;
    md.highest_price = base;
    md.lowest_price = base;
    md.upper_limit_price = base * 1.1;
    md.lower_limit_price = base * 0.9;
    md.last_price = base;
    md
}

/// Move one instrument's book a step along the deterministic walk.
fn advance(md: &mut DepthMarketData, step: u64) {
    let phase = step % (2 * WALK_SPAN);
    let offset = if phase < WALK_SPAN { phase as f64 } else { (2 * WALK_SPAN - phase) as f64 };
    let price = md.pre_settlement_price + (offset - (WALK_SPAN / 2) as f64) * TICK_SIZE;

    md.last_price = price;
    md.highest_price = md.highest_price.max(price);
    md.lowest_price = md.lowest_price.min(price);
    md.volume += 1 + (step % 7) as i64;
    md.turnover += price * (1 + step % 7) as f64;
    md.open_interest = 10_000.0 + (step % 100) as f64;

    for lvl in 0..DEPTH_LEVELS {
        let k = (lvl + 1) as f64;
        md.bid_prices[lvl] = price - k * TICK_SIZE;
        md.ask_prices[lvl] = price + k * TICK_SIZE;
        md.bid_volumes[lvl] = 10 * (lvl as i32 + 1) + (step % 5) as i32;
        md.ask_volumes[lvl] = 10 * (lvl as i32 + 1) + ((step + 2) % 5) as i32;
    }

    let now_us = time_util::now_us();
    md.local_time_us = now_us;
    md.update_millisec = ((now_us / 1_000) % 1_000) as i32;
    md.update_time = id_to_bytes(&clock_time(now_us));
}

/// `HH:MM:SS` (UTC) for a microsecond timestamp.
fn clock_time(now_us: u64) -> String {
    let secs = (now_us / 1_000_000) % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3_600, (secs / 60) % 60, secs % 60)
}
