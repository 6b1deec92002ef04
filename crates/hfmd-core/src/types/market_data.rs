//! Depth market data snapshot — the payload moved through the ring.
//!
//! The layout mirrors a futures-exchange depth notification: identifiers are
//! fixed-size null-padded byte arrays, prices are `f64`, and five levels of
//! book are carried inline. The struct is `#[repr(C)]` and `Copy` so the
//! producer can copy a whole snapshot into a ring slot with one memcpy.

use super::id::{id_from_bytes, id_to_bytes};

/// Width of the trading-day and update-time fields (`"20251017"`, `"09:30:01"` + NUL).
pub const DATE_LEN: usize = 9;

/// Width of the instrument id field.
pub const INSTRUMENT_ID_LEN: usize = 31;

/// Width of the exchange id field.
pub const EXCHANGE_ID_LEN: usize = 9;

/// Number of book levels carried on each side.
pub const DEPTH_LEVELS: usize = 5;

/// Five-level depth snapshot for one instrument.
///
/// `bid_prices[0]` is the best (highest) bid, `ask_prices[0]` is the best
/// (lowest) ask. Empty levels are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct DepthMarketData {
    pub trading_day: [u8; DATE_LEN],
    pub instrument_id: [u8; INSTRUMENT_ID_LEN],
    pub exchange_id: [u8; EXCHANGE_ID_LEN],
    pub last_price: f64,
    pub pre_settlement_price: f64,
    pub pre_close_price: f64,
    pub open_price: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub upper_limit_price: f64,
    pub lower_limit_price: f64,
    pub volume: i64,
    pub turnover: f64,
    pub open_interest: f64,
    pub bid_prices: [f64; DEPTH_LEVELS],
    pub bid_volumes: [i32; DEPTH_LEVELS],
    pub ask_prices: [f64; DEPTH_LEVELS],
    pub ask_volumes: [i32; DEPTH_LEVELS],
    pub update_time: [u8; DATE_LEN],
    pub update_millisec: i32,
    /// Local receive time in microseconds since Unix epoch.
    pub local_time_us: u64,
}

impl DepthMarketData {
    /// Empty snapshot tagged with the given instrument and exchange.
    pub fn new(instrument_id: &str, exchange_id: &str) -> Self {
        Self {
            instrument_id: id_to_bytes(instrument_id),
            exchange_id: id_to_bytes(exchange_id),
            ..Self::default()
        }
    }

    pub fn instrument(&self) -> &str {
        id_from_bytes(&self.instrument_id)
    }

    pub fn exchange(&self) -> &str {
        id_from_bytes(&self.exchange_id)
    }
}
