//! Typed error definitions for the HFMD transport.
//!
//! Provides [`HfError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate seamlessly with `anyhow::Result`.
//!
//! Steady-state outcomes of the queue (full on push, empty on pop) are never
//! errors; they are reported through `bool` / `Option` return values.

use thiserror::Error;

/// Domain-specific errors for the HFMD transport.
#[derive(Debug, Error)]
pub enum HfError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Ring buffer construction error (zero capacity, layout overflow, OOM).
    #[error("ring buffer error: {0}")]
    Ring(String),

    /// Consumer engine lifecycle error (thread spawn, lost worker).
    #[error("engine error: {0}")]
    Engine(String),
}
