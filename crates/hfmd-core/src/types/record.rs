//! The unit moved through the ring: a payload plus its capture timestamp.

/// A payload stamped with the cycle counter at enqueue time.
///
/// Copied into a ring slot by value and copied out again on `pop`; nothing
/// inside the ring ever holds a reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Stamped<T: Copy> {
    pub payload: T,
    /// Counter value read by the producer just before `push`.
    pub capture_cycles: u64,
}

impl<T: Copy> Stamped<T> {
    #[inline(always)]
    pub fn new(payload: T, capture_cycles: u64) -> Self {
        Self { payload, capture_cycles }
    }
}
