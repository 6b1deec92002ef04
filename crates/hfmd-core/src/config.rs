//! Configuration parsing for the HFMD transport.
//!
//! The runner reads its settings from a single JSON file. Every field is
//! optional; the `effective_*` accessors apply defaults and [`AppConfig::validate`]
//! rejects values that would make the ring unusable.
//!
//! # Example config
//!
//! ```json
//! {
//!   "HfMd": { "module_name": "hfmd", "log_path": "/tmp/log" },
//!   "engine": { "ring_capacity": 4096, "stat_batch": 100, "cpu_affinity": 2, "report_in_ns": true },
//!   "feed": {
//!     "instruments": ["au2512", "ag2512", "rb2601", "cu2601"],
//!     "exchange_id": "SHFE",
//!     "rate_per_sec": 2000,
//!     "cpu_affinity": 3
//!   }
//! }
//! ```

use serde::Deserialize;

use crate::{error::HfError, latency::DEFAULT_BATCH_SIZE};

/// Default ring capacity in records.
pub const DEFAULT_RING_CAPACITY: usize = 4096;

/// Default synthetic feed rate in events per second.
pub const DEFAULT_FEED_RATE: u64 = 1_000;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(rename = "HfMd")]
    pub meta: Option<ModuleMeta>,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub feed: FeedSection,
}

/// Module metadata block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// Ring and consumer settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSection {
    /// Ring capacity in records (default: 4096).
    pub ring_capacity: Option<usize>,

    /// Samples per latency report (default: 100).
    #[serde(alias = "batch_size")]
    pub stat_batch: Option<usize>,

    /// CPU core for the consumer thread. Negative or absent means unpinned.
    pub cpu_affinity: Option<i32>,

    /// Log reports in calibrated nanoseconds as well as raw ticks.
    pub report_in_ns: Option<bool>,
}

/// Synthetic feed settings — the stand-in for a vendor market data callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedSection {
    /// Instruments to cycle through (default: a single `"au2512"`).
    pub instruments: Option<Vec<String>>,

    pub exchange_id: Option<String>,

    /// Events per second; 0 means emit as fast as possible (default: 1000).
    pub rate_per_sec: Option<u64>,

    /// CPU core for the feed thread.
    pub cpu_affinity: Option<i32>,
}

impl AppConfig {
    pub fn module_name(&self) -> String {
        self.meta.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "hfmd".to_string())
    }

    pub fn log_path(&self) -> Option<String> {
        self.meta.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Reject settings that cannot produce a working pipeline.
    pub fn validate(&self) -> Result<(), HfError> {
        if self.engine.ring_capacity == Some(0) {
            return Err(HfError::Config("engine.ring_capacity must be at least 1".into()));
        }
        if self.engine.stat_batch == Some(0) {
            return Err(HfError::Config("engine.stat_batch must be at least 1".into()));
        }
        if self.feed.instruments.as_ref().is_some_and(|v| v.is_empty()) {
            return Err(HfError::Config("feed.instruments must not be empty".into()));
        }
        Ok(())
    }
}

impl EngineSection {
    pub fn effective_ring_capacity(&self) -> usize {
        self.ring_capacity.unwrap_or(DEFAULT_RING_CAPACITY)
    }

    pub fn effective_stat_batch(&self) -> usize {
        self.stat_batch.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn report_in_ns(&self) -> bool {
        self.report_in_ns.unwrap_or(false)
    }
}

impl FeedSection {
    pub fn effective_instruments(&self) -> Vec<String> {
        self.instruments.clone().unwrap_or_else(|| vec!["au2512".to_string()])
    }

    pub fn effective_exchange_id(&self) -> String {
        self.exchange_id.clone().unwrap_or_else(|| "SHFE".to_string())
    }

    pub fn effective_rate(&self) -> u64 {
        self.rate_per_sec.unwrap_or(DEFAULT_FEED_RATE)
    }
}

/// Load, parse and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let json = r#"{
            "HfMd": { "module_name": "shfe_md", "log_path": "/tmp/log" },
            "engine": { "ring_capacity": 1024, "stat_batch": 50, "cpu_affinity": 2, "report_in_ns": true },
            "feed": { "instruments": ["au2512", "rb2601"], "exchange_id": "SHFE", "rate_per_sec": 0, "cpu_affinity": 3 }
        }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.module_name(), "shfe_md");
        assert_eq!(cfg.log_path().as_deref(), Some("/tmp/log"));
        assert_eq!(cfg.engine.effective_ring_capacity(), 1024);
        assert_eq!(cfg.engine.effective_stat_batch(), 50);
        assert_eq!(cfg.engine.cpu_affinity, Some(2));
        assert!(cfg.engine.report_in_ns());
        assert_eq!(cfg.feed.effective_instruments(), ["au2512", "rb2601"]);
        assert_eq!(cfg.feed.effective_rate(), 0);
    }

    #[test]
    fn empty_object_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.module_name(), "hfmd");
        assert_eq!(cfg.engine.effective_ring_capacity(), DEFAULT_RING_CAPACITY);
        assert_eq!(cfg.engine.effective_stat_batch(), DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.feed.effective_exchange_id(), "SHFE");
        assert_eq!(cfg.feed.effective_rate(), DEFAULT_FEED_RATE);
    }

    #[test]
    fn batch_size_alias() {
        let cfg: AppConfig = serde_json::from_str(r#"{ "engine": { "batch_size": 7 } }"#).unwrap();
        assert_eq!(cfg.engine.effective_stat_batch(), 7);
    }

    #[test]
    fn zero_capacity_rejected() {
        let cfg: AppConfig = serde_json::from_str(r#"{ "engine": { "ring_capacity": 0 } }"#).unwrap();
        assert!(matches!(cfg.validate(), Err(HfError::Config(_))));
    }

    #[test]
    fn empty_instrument_list_rejected() {
        let cfg: AppConfig = serde_json::from_str(r#"{ "feed": { "instruments": [] } }"#).unwrap();
        assert!(matches!(cfg.validate(), Err(HfError::Config(_))));
    }
}
