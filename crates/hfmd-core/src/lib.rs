//! # hfmd-core
//!
//! Core crate for the HFMD market data transport, providing:
//!
//! - **Ring buffer** (`ring`) — lock-free SPSC queue with cache-line isolated cursors
//! - **Types** (`types`) — depth snapshot struct, stamped record wrapper, id helpers
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Error types** (`error`) — domain-specific `HfError` via thiserror
//! - **CPU affinity** (`cpu_affinity`) — thread-to-core pinning for low latency
//! - **Latency** (`latency`) — batched min/max/mean latency window
//! - **Time utilities** (`time_util`) — cycle counter and high-precision clocks
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod cpu_affinity;
pub mod error;
pub mod latency;
pub mod logging;
pub mod ring;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use error::HfError;
pub use types::*;
