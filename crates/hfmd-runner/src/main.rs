//! # hfmd-runner
//!
//! Main entry point for the HFMD market data transport.
//!
//! Loads a JSON configuration file, builds the SPSC ring, starts the consumer
//! engine, then starts the synthetic depth feed that stands in for a vendor
//! market data callback. Runs until Ctrl+C (or until `--events` have been
//! emitted), then stops the feed first and the engine second.
//!
//! # Usage
//!
//! ```bash
//! hfmd-runner config.json --log-level info
//! hfmd-runner config.json --events 100000
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use hfmd_core::{DepthMarketData, Stamped, ring, time_util};
use hfmd_md::{
    EngineConfig, LogSink, MarketDataEngine, MdProducer,
    sim_feed::{FeedConfig, SimulatedFeed},
};
use tracing::{info, warn};

/// HFMD Market Data Transport Runner.
#[derive(Parser)]
#[command(name = "hfmd-runner", about = "Lock-free market data transport with latency reporting")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides the config).
    #[arg(long)]
    log_dir: Option<String>,

    /// Stop after the feed has emitted this many events.
    #[arg(long)]
    events: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = hfmd_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    hfmd_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name())?;

    info!("hfmd-runner starting — config={}, log_level={}", cli.config.display(), cli.log_level);
    if !time_util::HAS_CYCLE_COUNTER {
        warn!("no hardware cycle counter on this target, latencies are in nanoseconds");
    }

    // 3. Ring
    let capacity = config.engine.effective_ring_capacity();
    let (tx, rx) = ring::channel::<Stamped<DepthMarketData>>(capacity)?;
    info!("ring initialized — capacity={capacity}");

    // 4. Consumer engine
    let mut sink = LogSink::new(config.module_name());
    if config.engine.report_in_ns() {
        let rate = tokio::task::spawn_blocking(|| time_util::calibrate_cycles_per_ns(Duration::from_millis(100))).await?;
        info!("counter calibrated — {rate:.3} ticks/ns");
        sink = sink.with_nanos(rate);
    }
    let engine_config = EngineConfig {
        stat_batch: config.engine.effective_stat_batch(),
        cpu_core: config.engine.cpu_affinity,
        ..EngineConfig::default()
    };
    let mut engine = MarketDataEngine::new(rx, engine_config, sink);
    engine.start()?;

    // 5. Feed
    let producer = MdProducer::new(tx);
    let stats = producer.stats();
    let feed_config = FeedConfig {
        instruments: config.feed.effective_instruments(),
        exchange_id: config.feed.effective_exchange_id(),
        rate_per_sec: config.feed.effective_rate(),
        cpu_core: config.feed.cpu_affinity,
        max_events: cli.events,
    };
    let mut feed = SimulatedFeed::spawn(producer, feed_config)?;

    info!("system running — press Ctrl+C to stop");

    // 6. Wait for shutdown signal or feed exhaustion
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("shutdown signal received");
        }
        _ = wait_for_feed(&feed) => {
            info!("feed exhausted");
        }
    }

    // 7. Stop the producer side first so nothing new is queued, then the consumer.
    let emitted = feed.stop();
    engine.stop();

    info!(
        "shutdown complete — emitted={emitted} published={} dropped={} processed={}",
        stats.published(),
        stats.dropped(),
        engine.processed(),
    );
    Ok(())
}

async fn wait_for_feed(feed: &SimulatedFeed) {
    while !feed.is_finished() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
