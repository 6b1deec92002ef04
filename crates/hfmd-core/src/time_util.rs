//! High-precision time utilities.
//!
//! Two kinds of clock live here:
//!
//! - **Cycle counter** ([`now_cycles`]) — the cheapest monotonic
//!   high-resolution counter the target offers (`rdtsc` on x86_64,
//!   `cntvct_el0` on aarch64, a monotonic nanosecond clock elsewhere). Used to
//!   stamp records on the producer side and measure queueing delay on the
//!   consumer side.
//! - **Wall / monotonic clocks** — `clock_gettime` on Linux, `SystemTime` /
//!   `Instant` as fallback.
//!
//! Cycle counts taken on different cores are only comparable when the
//! platform keeps the counters synchronized (invariant TSC on modern x86_64).
//! Whether that holds is a property of the deployment host, not of this crate.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Linux: use clock_gettime for maximum precision
// ---------------------------------------------------------------------------

#[cfg(target_os = "linux")]
#[inline]
fn clock_realtime() -> (u64, u64) {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: CLOCK_REALTIME is always valid. Failure returns -1 but the
    // zeroed ts is a safe fallback (epoch).
    unsafe {
        libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts);
    }
    (ts.tv_sec as u64, ts.tv_nsec as u64)
}

#[cfg(target_os = "linux")]
#[inline]
fn clock_monotonic() -> (u64, u64) {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: same as above.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut ts);
    }
    (ts.tv_sec as u64, ts.tv_nsec as u64)
}

// ---------------------------------------------------------------------------
// Non-Linux: SystemTime / Instant fallback
// ---------------------------------------------------------------------------

#[cfg(not(target_os = "linux"))]
#[inline]
fn clock_realtime() -> (u64, u64) {
    use std::time::{SystemTime, UNIX_EPOCH};
    let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    (d.as_secs(), d.subsec_nanos() as u64)
}

#[cfg(not(target_os = "linux"))]
#[inline]
fn clock_monotonic() -> (u64, u64) {
    use std::{sync::LazyLock, time::Instant};
    static ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);
    let d = ORIGIN.elapsed();
    (d.as_secs(), d.subsec_nanos() as u64)
}

// ---------------------------------------------------------------------------
// Cycle counter
// ---------------------------------------------------------------------------

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_counter() -> u64 {
    // SAFETY: rdtsc is available on every x86_64 CPU and has no side effects.
    unsafe { core::arch::x86_64::_rdtsc() }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn read_counter() -> u64 {
    let v: u64;
    // SAFETY: the virtual counter is readable from EL0 on Linux and macOS.
    unsafe {
        core::arch::asm!("mrs {}, cntvct_el0", out(reg) v, options(nomem, nostack));
    }
    v
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn read_counter() -> u64 {
    monotonic_ns()
}

/// Whether [`now_cycles`] reads a hardware counter rather than the
/// nanosecond fallback clock.
pub const HAS_CYCLE_COUNTER: bool = cfg!(any(target_arch = "x86_64", target_arch = "aarch64"));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Current value of the high-resolution counter.
///
/// Units are counter ticks: CPU cycles with `rdtsc`, timer ticks with
/// `cntvct_el0`, nanoseconds on the fallback path. Use
/// [`calibrate_cycles_per_ns`] to convert.
#[inline(always)]
pub fn now_cycles() -> u64 {
    read_counter()
}

/// Ticks elapsed from `start` to `end`, safe across counter wraparound.
///
/// A counter that wraps between the two reads still yields the small forward
/// distance instead of a huge bogus value.
#[inline(always)]
pub fn cycles_between(start: u64, end: u64) -> u64 {
    end.wrapping_sub(start)
}

/// Estimate counter ticks per nanosecond by sampling the counter against the
/// monotonic clock over `window`.
///
/// Blocks the calling thread for roughly `window`. Returns `1.0` if the
/// measurement is degenerate (zero elapsed time or a non-advancing counter).
pub fn calibrate_cycles_per_ns(window: Duration) -> f64 {
    let ns0 = monotonic_ns();
    let c0 = now_cycles();
    std::thread::sleep(window);
    let c1 = now_cycles();
    let ns1 = monotonic_ns();

    let elapsed_ns = ns1.saturating_sub(ns0);
    let elapsed_cycles = cycles_between(c0, c1);
    if elapsed_ns == 0 || elapsed_cycles == 0 {
        return 1.0;
    }
    elapsed_cycles as f64 / elapsed_ns as f64
}

/// Current time as **microseconds** since Unix epoch.
#[inline]
pub fn now_us() -> u64 {
    let (sec, nsec) = clock_realtime();
    sec * 1_000_000 + nsec / 1_000
}

/// Monotonic clock in **nanoseconds** — for elapsed-time measurements
/// without wall-clock jumps.
#[inline]
pub fn monotonic_ns() -> u64 {
    let (sec, nsec) = clock_monotonic();
    sec * 1_000_000_000 + nsec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_does_not_go_backwards_on_one_thread() {
        let a = now_cycles();
        let b = now_cycles();
        assert!(cycles_between(a, b) < u64::MAX / 2);
    }

    #[test]
    fn wraparound_is_small_forward_distance() {
        assert_eq!(cycles_between(u64::MAX - 4, 5), 10);
        assert_eq!(cycles_between(100, 100), 0);
        assert_eq!(cycles_between(100, 250), 150);
    }

    #[test]
    fn calibration_is_positive() {
        let f = calibrate_cycles_per_ns(Duration::from_millis(5));
        assert!(f > 0.0);
    }

    #[test]
    fn wall_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z in microseconds
        assert!(now_us() > 1_577_836_800_000_000);
    }
}
