//! # hfmd-md
//!
//! Market data path on top of the `hfmd-core` ring.
//!
//! ```text
//! vendor I/O thread                       engine thread
//! ┌──────────────┐  push  ┌──────┐  pop  ┌──────────────────┐  report  ┌────────────┐
//! │ MdProducer   │ ─────► │ ring │ ────► │ MarketDataEngine │ ───────► │ RecordSink │
//! │ (stamp+copy) │        └──────┘       │ (latency window) │          └────────────┘
//! └──────────────┘                       └──────────────────┘
//! ```
//!
//! - [`producer`] — callback-side adapter: stamp, copy, push, count drops
//! - [`engine`] — consumer thread with start/stop lifecycle and batched reporting
//! - [`sink`] — outbound report interface and stock sinks
//! - [`sim_feed`] — synthetic depth feed standing in for a vendor API thread

pub mod engine;
pub mod producer;
pub mod sim_feed;
pub mod sink;

pub use engine::{EngineConfig, EngineState, MarketDataEngine};
pub use producer::{MdProducer, ProducerStats};
pub use sink::{ChannelSink, LogSink, RecordSink};
