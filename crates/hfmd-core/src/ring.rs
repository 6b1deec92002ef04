//! Lock-free single-producer / single-consumer ring buffer.
//!
//! The ring moves `Copy` records from exactly one writer thread to exactly one
//! reader thread without locks and without allocating after construction.
//! [`channel`] returns the two halves as separate handles; `push` and `pop`
//! take `&mut self`, so each cursor can only ever be advanced by the thread
//! that owns the matching handle.
//!
//! # Memory layout
//!
//! ```text
//! SpscRing
//! ┌──────────────────────────────── 64 B ─┐
//! │ tail: AtomicUsize (producer writes)   │  CachePadded
//! ├───────────────────────────────────────┤
//! │ head: AtomicUsize (consumer writes)   │  CachePadded
//! ├───────────────────────────────────────┤
//! │ slots: ptr, len                       │  read-only after construction
//! └───────────────────────────────────────┘
//!
//! heap (64-byte aligned)
//! ┌────────┬────────┬─────┬────────┐
//! │ slot 0 │ slot 1 │ ... │ slot C │   C + 1 slots, one always empty
//! └────────┴────────┴─────┴────────┘
//! ```
//!
//! Unread records occupy `[head, tail)` modulo `C + 1`. The ring is empty iff
//! `head == tail` and full iff `tail + 1 == head` (mod `C + 1`); the reserved
//! slot is what makes those two states distinguishable.
//!
//! # Ordering
//!
//! The producer writes the slot, then stores `tail` with `Release`; the
//! consumer loads `tail` with `Acquire` before reading the slot. The mirror
//! pair on `head` hands a slot back to the producer only after the consumer
//! has finished copying it out. Each thread loads its own cursor `Relaxed`.

use std::{
    alloc::{self, Layout},
    fmt,
    mem::{self, MaybeUninit},
    ops::Deref,
    ptr::NonNull,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::error::HfError;

/// Assumed cache line size for padding and slot alignment.
pub const CACHE_LINE_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// CachePadded
// ---------------------------------------------------------------------------

/// Pads and aligns a value to a full cache line so that neighbouring fields
/// never share a line with it.
#[repr(align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.value
    }
}

// ---------------------------------------------------------------------------
// AlignedSlots — owned, fixed-length, cache-line aligned storage
// ---------------------------------------------------------------------------

/// A single heap allocation of `len` uninitialised slots, aligned to
/// [`CACHE_LINE_SIZE`], freed on drop. Never resized.
struct AlignedSlots<T> {
    ptr: NonNull<MaybeUninit<T>>,
    len: usize,
    layout: Layout,
}

impl<T> AlignedSlots<T> {
    fn new(len: usize) -> Result<Self, HfError> {
        let layout = Layout::array::<MaybeUninit<T>>(len)
            .and_then(|l| l.align_to(CACHE_LINE_SIZE))
            .map_err(|e| HfError::Ring(format!("slot layout for {len} records: {e}")))?;

        // Zero-sized payloads need no backing memory.
        if layout.size() == 0 {
            return Ok(Self { ptr: NonNull::dangling(), len, layout });
        }

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw.cast::<MaybeUninit<T>>())
            .ok_or_else(|| HfError::Ring(format!("allocation of {} bytes failed", layout.size())))?;

        Ok(Self { ptr, len, layout })
    }

    /// Raw pointer to slot `idx`.
    ///
    /// # Safety
    ///
    /// `idx` must be `< self.len`.
    #[inline(always)]
    unsafe fn slot(&self, idx: usize) -> *mut MaybeUninit<T> {
        debug_assert!(idx < self.len);
        // SAFETY: caller guarantees idx is in bounds of the allocation.
        unsafe { self.ptr.as_ptr().add(idx) }
    }
}

impl<T> Drop for AlignedSlots<T> {
    fn drop(&mut self) {
        // Payloads are `Copy`, so there is nothing to drop in place.
        if self.layout.size() != 0 {
            // SAFETY: ptr was returned by `alloc::alloc` with this layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) };
        }
    }
}

// ---------------------------------------------------------------------------
// SpscRing
// ---------------------------------------------------------------------------

/// Shared state behind a [`RingProducer`] / [`RingConsumer`] pair.
struct SpscRing<T> {
    /// Next slot to write. Stored only by the producer.
    tail: CachePadded<AtomicUsize>,
    /// Next slot to read. Stored only by the consumer.
    head: CachePadded<AtomicUsize>,
    slots: AlignedSlots<T>,
}

// SAFETY: slots are only touched through the cursor protocol below. A slot in
// [head, tail) is read only by the consumer, every other slot is written only
// by the producer, and ownership changes hands through Release/Acquire pairs.
unsafe impl<T: Send> Send for SpscRing<T> {}
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T: Copy> SpscRing<T> {
    fn with_capacity(capacity: usize) -> Result<Self, HfError> {
        if capacity == 0 {
            return Err(HfError::Ring("capacity must be at least 1".into()));
        }
        let len = capacity
            .checked_add(1)
            .ok_or_else(|| HfError::Ring(format!("capacity {capacity} overflows slot count")))?;

        Ok(Self {
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
            slots: AlignedSlots::new(len)?,
        })
    }

    #[inline(always)]
    fn next(&self, idx: usize) -> usize {
        let n = idx + 1;
        if n == self.slots.len { 0 } else { n }
    }

    /// # Safety
    ///
    /// Must only be called from the single producer thread.
    #[inline(always)]
    unsafe fn push(&self, item: T) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let next_tail = self.next(tail);

        if next_tail == self.head.load(Ordering::Acquire) {
            return false;
        }

        // SAFETY: `tail` is in bounds and outside [head, tail), so the
        // consumer is not reading it.
        unsafe { self.slots.slot(tail).write(MaybeUninit::new(item)) };
        self.tail.store(next_tail, Ordering::Release);
        true
    }

    /// # Safety
    ///
    /// Must only be called from the single consumer thread.
    #[inline(always)]
    unsafe fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `head` is in [head, tail), so the producer finished writing
        // it before publishing the tail we just acquired.
        let item = unsafe { self.slots.slot(head).read().assume_init() };
        self.head.store(self.next(head), Ordering::Release);
        Some(item)
    }

    #[inline]
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if tail >= head { tail - head } else { self.slots.len - head + tail }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len - 1
    }
}

// ---------------------------------------------------------------------------
// Public handles
// ---------------------------------------------------------------------------

/// Create a ring that holds up to `capacity` records and return its two halves.
///
/// Allocates `capacity + 1` slots once; nothing is allocated afterwards.
///
/// # Errors
///
/// [`HfError::Ring`] if `capacity` is zero, the slot array size overflows, or
/// the allocation fails.
pub fn channel<T: Copy + Send>(capacity: usize) -> Result<(RingProducer<T>, RingConsumer<T>), HfError> {
    let ring = Arc::new(SpscRing::with_capacity(capacity)?);
    Ok((RingProducer { ring: Arc::clone(&ring) }, RingConsumer { ring }))
}

/// Writing half of the ring. Owned by the producer thread.
pub struct RingProducer<T: Copy> {
    ring: Arc<SpscRing<T>>,
}

impl<T: Copy + Send> RingProducer<T> {
    /// Copy `item` into the next free slot.
    ///
    /// Returns `false`, leaving the ring untouched, if the ring is full. Never
    /// blocks or retries.
    #[inline(always)]
    pub fn push(&mut self, item: T) -> bool {
        // SAFETY: `&mut self` on the only producer handle.
        unsafe { self.ring.push(item) }
    }

    /// Maximum number of records the ring holds.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Unread records at this instant. Racy by nature; for monitoring only.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

/// Reading half of the ring. Owned by the consumer thread.
pub struct RingConsumer<T: Copy> {
    ring: Arc<SpscRing<T>>,
}

impl<T: Copy + Send> RingConsumer<T> {
    /// Copy the oldest unread record out of the ring.
    ///
    /// Returns `None`, leaving the ring untouched, if the ring is empty.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: `&mut self` on the only consumer handle.
        unsafe { self.ring.pop() }
    }

    /// Like [`pop`](Self::pop), writing into a caller-owned slot.
    ///
    /// Returns `false` and leaves `out` untouched if the ring is empty.
    #[inline(always)]
    pub fn pop_into(&mut self, out: &mut T) -> bool {
        match self.pop() {
            Some(item) => {
                *out = item;
                true
            }
            None => false,
        }
    }

    /// Maximum number of records the ring holds.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Unread records at this instant. Racy by nature; for monitoring only.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Copy> fmt::Debug for RingProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingProducer").field("capacity", &self.ring.capacity()).finish()
    }
}

impl<T: Copy> fmt::Debug for RingConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingConsumer").field("capacity", &self.ring.capacity()).finish()
    }
}

const _: () = assert!(mem::align_of::<CachePadded<AtomicUsize>>() == CACHE_LINE_SIZE);
