//! Cache-line isolated storage cells.
//!
//! # Memory Layout
//!
//! ```text
//! ┌──────────────────────────────┐ ← aligned to CACHE_LINE_SIZE
//! │  value: UnsafeCell<T>        │
//! │  padding                     │
//! ├──────────────────────────────┤ ← next slot starts on a fresh line
//! │  value: UnsafeCell<T>        │
//! │  ...                         │
//! ```
//!
//! Adjacent slots never share a line, so the writer filling one slot does not
//! invalidate the line the reader is copying out of.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::align_of;

/// Alignment `CachePadded` picks for this target (128 on x86_64 and aarch64,
/// where the prefetcher pulls lines in pairs; 64 or less elsewhere).
pub const CACHE_LINE_SIZE: usize = align_of::<CachePadded<u8>>();

/// One storage cell of the ring.
///
/// Access is coordinated entirely by the two published cursors; the cell
/// itself carries no synchronization.
#[repr(transparent)]
pub(crate) struct Slot<T> {
    value: CachePadded<UnsafeCell<T>>,
}

impl<T> Slot<T> {
    #[inline]
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: CachePadded::new(UnsafeCell::new(value)),
        }
    }

    #[inline(always)]
    pub(crate) fn get(&self) -> *mut T {
        self.value.get()
    }
}
