//! CPU affinity utilities for binding threads to specific cores.
//!
//! Pinning the consumer's poll loop (and optionally the feed thread) to a
//! dedicated core avoids scheduler migration, which would otherwise show up
//! as multi-microsecond outliers in the latency reports. Pinning is advisory:
//! every failure is logged and reported as `false`, never as an error.

use tracing::{info, warn};

/// Bind the current thread to the specified CPU core.
///
/// Returns `true` if the binding succeeded, `false` if the core ID is invalid,
/// the platform cannot enumerate cores, or the OS rejected the request.
///
/// # Example
///
/// ```ignore
/// std::thread::spawn(move || {
///     hfmd_core::cpu_affinity::bind_to_core(2);
///     poll_loop();
/// });
/// ```
pub fn bind_to_core(core_id: usize) -> bool {
    let Some(core_ids) = core_affinity::get_core_ids() else {
        warn!("CPU affinity unsupported on this platform, core {core_id} not bound");
        return false;
    };
    match core_ids.get(core_id) {
        Some(core) => {
            let ok = core_affinity::set_for_current(*core);
            if ok {
                info!("bound thread to CPU core {core_id}");
            } else {
                warn!("failed to bind thread to CPU core {core_id}");
            }
            ok
        }
        None => {
            warn!(
                "CPU core {core_id} not available (system has {} cores)",
                core_ids.len()
            );
            false
        }
    }
}

/// Bind the current thread to the specified core, if `core_id` is `Some`.
///
/// `None` or a negative id means no affinity is configured and returns `false`
/// without touching the scheduler.
pub fn maybe_bind(core_id: Option<i32>) -> bool {
    match core_id {
        Some(id) if id >= 0 => bind_to_core(id as usize),
        _ => false,
    }
}
