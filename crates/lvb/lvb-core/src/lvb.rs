//! Lock-free single-producer, single-consumer latest-value buffer.
//!
//! A fixed ring of cache-padded slots shared by exactly one writer and one
//! reader. Unlike a queue, the contract is not to deliver every item: the
//! writer never blocks and never overwrites the slot the reader holds, the
//! reader never blocks and never reads past what the writer has published.
//! When either side cannot make progress it says so through a staleness
//! count instead of waiting.
//!
//! # Design
//! - **Writer**: fills the slot exposed by [`Writer::writing`], then calls
//!   [`Writer::writer_advance`] to publish it and move to the next slot.
//!   When the ring is full the slot is not published and the next write
//!   overwrites it.
//! - **Reader**: calls [`Reader::reader_advance`] to release the slot it holds
//!   and take the next published one, exposed by [`Reader::reading`]. When
//!   nothing new is published it keeps holding the previous value.
//!
//! The two sides share only two cursors:
//!
//! ```text
//!   writing_pos: slot the writer is filling (every slot before it, back to
//!                reading_pos, is published). Stored by the writer only.
//!   reading_pos: slot the reader holds (the writer must not reuse it).
//!                Stored by the reader only.
//!
//!        reading_pos              writing_pos
//!             v                        v
//!   ... ][ held ][ pub ][ pub ][ pub ][ filling ][ free ][ free ][ ...
//! ```
//!
//! Each cursor is published with a `Release` store and observed with an
//! `Acquire` load, so the slot contents written before a store are visible to
//! the thread that sees the new cursor value. All other bookkeeping lives in
//! the handle that owns it and is never touched by the other thread.
//!
//! # Thread Safety
//! - [`Lvb::split`] is the only way to obtain the two handles, so exactly one
//!   [`Writer`] and one [`Reader`] exist per buffer.
//! - Both handles are `Send` (when `T: Send`) but NOT `Sync`.

use crate::ring::{RingConfig, decr_mod, incr_mod};
use crate::slot::Slot;
use crossbeam_utils::CachePadded;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Slot the writer fills first.
const INITIAL_WRITING: usize = 1;
/// Slot the reader holds before its first advance.
const INITIAL_READING: usize = 0;

/// State reachable from both threads.
struct Shared<T> {
    slots: Box<[Slot<T>]>,
    /// Slot the writer is currently filling. Written by the writer only.
    writing_pos: CachePadded<AtomicUsize>,
    /// Slot the reader currently holds. Written by the reader only.
    reading_pos: CachePadded<AtomicUsize>,
}

// SAFETY: a slot is only ever dereferenced by the side that owns it according
// to the two cursors, so no slot is accessed from two threads at once. Values
// do move between threads, hence `T: Send`.
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    #[inline(always)]
    fn slot(&self, idx: usize) -> *mut T {
        self.slots[idx].get()
    }
}

/// A latest-value buffer, before it is split into its two sides.
///
/// # Example
/// ```
/// use lvb_core::Lvb;
///
/// let (mut writer, mut reader) = Lvb::<u64>::new().split();
///
/// assert_eq!(writer.put(7), 0);
/// assert_eq!(reader.get_with_staleness(), (7, 0));
/// // Nothing new: the reader keeps the last value and reports idleness.
/// assert_eq!(reader.get_with_staleness(), (7, 1));
/// ```
pub struct Lvb<T> {
    shared: Shared<T>,
    config: RingConfig,
}

impl<T: Default> Lvb<T> {
    /// Creates a buffer with [`DEFAULT_SLACK`](crate::DEFAULT_SLACK), every
    /// slot holding `T::default()`.
    pub fn new() -> Self {
        Self::with_config(RingConfig::default())
    }

    /// Creates a buffer with the given geometry, every slot holding
    /// `T::default()`.
    pub fn with_config(config: RingConfig) -> Self {
        Self::from_fn(config, |_| T::default())
    }
}

impl<T: Default> Default for Lvb<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Lvb<T> {
    /// Creates a buffer whose slot `i` initially holds `init(i)`.
    ///
    /// Slot 0 is what the reader exposes until its first successful advance.
    pub fn from_fn<F: FnMut(usize) -> T>(config: RingConfig, mut init: F) -> Self {
        let slots: Box<[Slot<T>]> = (0..config.size()).map(|i| Slot::new(init(i))).collect();
        Self {
            shared: Shared {
                slots,
                writing_pos: CachePadded::new(AtomicUsize::new(INITIAL_WRITING)),
                reading_pos: CachePadded::new(AtomicUsize::new(INITIAL_READING)),
            },
            config,
        }
    }

    /// Total number of slots, `slack + 2`.
    #[inline]
    pub fn size(&self) -> usize {
        self.config.size()
    }

    #[inline]
    pub fn slack(&self) -> usize {
        self.config.slack()
    }

    /// Splits the buffer into its writer and reader.
    ///
    /// Each handle is meant to be moved to its own thread. They may also both
    /// stay on one thread, which gives plain sequential semantics.
    pub fn split(self) -> (Writer<T>, Reader<T>) {
        let size = self.config.size();
        let shared = Arc::new(self.shared);

        let writer = Writer {
            shared: Arc::clone(&shared),
            state: CachePadded::new(WriterState {
                writing: INITIAL_WRITING,
                next: incr_mod(INITIAL_WRITING, size),
                reader: INITIAL_READING,
                stale_cnt: 0,
            }),
            size,
            _unsync: PhantomData,
        };
        let reader = Reader {
            shared,
            state: CachePadded::new(ReaderState {
                reading: INITIAL_READING,
                next: incr_mod(INITIAL_READING, size),
                writer: INITIAL_WRITING,
                stale_cnt: 0,
                initialized: false,
            }),
            size,
            _unsync: PhantomData,
        };
        (writer, reader)
    }
}

impl<T> fmt::Debug for Lvb<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lvb").field("config", &self.config).finish()
    }
}

/// Writer-private bookkeeping.
#[derive(Debug)]
struct WriterState {
    /// Slot exposed through `writing()`.
    writing: usize,
    /// Slot the writer moves to on the next successful advance.
    next: usize,
    /// Last observed `reading_pos`.
    reader: usize,
    stale_cnt: u32,
}

/// The producing side of a latest-value buffer.
pub struct Writer<T> {
    shared: Arc<Shared<T>>,
    state: CachePadded<WriterState>,
    size: usize,
    /// Handles are `Send` but not `Sync`.
    _unsync: PhantomData<Cell<()>>,
}

impl<T> Writer<T> {
    /// The slot being filled. Not visible to the reader until a successful
    /// [`writer_advance`](Self::writer_advance).
    ///
    /// Allows building a value in place instead of moving one in.
    #[inline]
    pub fn writing(&mut self) -> &mut T {
        // SAFETY: `state.writing` equals the published `writing_pos`. The
        // reader only takes slots strictly before `writing_pos`, and the
        // writer never moves onto the slot at `reading_pos`, so this slot is
        // exclusively ours. `&mut self` rules out a second borrow.
        unsafe { &mut *self.shared.slot(self.state.writing) }
    }

    /// Publishes the slot exposed by [`writing`](Self::writing) and moves to
    /// the next one.
    ///
    /// # Returns
    /// - `0` if the value became visible to the reader.
    /// - `n > 0` if the ring is full (the reader still holds the slot the
    ///   writer would move to). Nothing is published and the writing slot is
    ///   unchanged, so the next write replaces the unpublished value. `n`
    ///   counts consecutive full calls and saturates at `u32::MAX`; knowing
    ///   the reader's period it can serve as a timeout on the reader.
    ///
    /// Never blocks. At most one extra atomic load when the cached reader
    /// position says the ring might be full.
    #[inline]
    pub fn writer_advance(&mut self) -> u32 {
        let state = &mut *self.state;

        // Caught up with the last reader position we know of: refresh it.
        if state.next == state.reader {
            state.reader = self.shared.reading_pos.load(Ordering::Acquire);
            if state.next == state.reader {
                state.stale_cnt = state.stale_cnt.saturating_add(1);
                return state.stale_cnt;
            }
        }

        // Release: the contents of the slot just filled must be visible
        // before the cursor that exposes it.
        self.shared.writing_pos.store(state.next, Ordering::Release);
        state.writing = state.next;
        state.next = incr_mod(state.next, self.size);
        state.stale_cnt = 0;
        0
    }

    /// Moves `value` into the writing slot and advances.
    ///
    /// Returns the [`writer_advance`](Self::writer_advance) staleness.
    #[inline]
    pub fn put(&mut self, value: T) -> u32 {
        *self.writing() = value;
        self.writer_advance()
    }

    /// Clones `value` into the writing slot, reusing its storage, and
    /// advances.
    #[inline]
    pub fn put_cloned(&mut self, value: &T) -> u32
    where
        T: Clone,
    {
        self.writing().clone_from(value);
        self.writer_advance()
    }

    /// Staleness returned by the last advance.
    #[inline]
    pub fn staleness(&self) -> u32 {
        self.state.stale_cnt
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl<T> fmt::Debug for Writer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("state", &*self.state)
            .field("size", &self.size)
            .finish()
    }
}

/// Reader-private bookkeeping.
#[derive(Debug)]
struct ReaderState {
    /// Slot exposed through `reading()`.
    reading: usize,
    /// Slot the reader moves to on the next successful advance.
    next: usize,
    /// Last observed `writing_pos`.
    writer: usize,
    /// Negative until the first successful advance, positive afterwards.
    stale_cnt: i32,
    initialized: bool,
}

impl ReaderState {
    #[inline(always)]
    fn stale(&mut self) -> i32 {
        self.stale_cnt = if self.initialized {
            self.stale_cnt.saturating_add(1)
        } else {
            self.stale_cnt.saturating_sub(1)
        };
        self.stale_cnt
    }

    #[inline(always)]
    fn fresh(&mut self) -> i32 {
        self.stale_cnt = 0;
        self.initialized = true;
        0
    }
}

/// The consuming side of a latest-value buffer.
pub struct Reader<T> {
    shared: Arc<Shared<T>>,
    state: CachePadded<ReaderState>,
    size: usize,
    /// Handles are `Send` but not `Sync`.
    _unsync: PhantomData<Cell<()>>,
}

impl<T> Reader<T> {
    /// The slot currently held.
    ///
    /// Before the first successful advance this is slot 0's initial value.
    #[inline]
    pub fn reading(&self) -> &T {
        // SAFETY: `state.reading` equals the published `reading_pos`, which
        // the writer never moves onto. The slot only changes through
        // `&mut self` methods, so the borrow cannot outlive our hold.
        unsafe { &*self.shared.slot(self.state.reading) }
    }

    /// Mutable access to the slot currently held.
    #[inline]
    pub fn reading_mut(&mut self) -> &mut T {
        // SAFETY: as in `reading`; `&mut self` makes the borrow unique.
        unsafe { &mut *self.shared.slot(self.state.reading) }
    }

    /// Releases the held slot and takes the next published one.
    ///
    /// Moves one slot per successful call, so values published while the
    /// reader was away are seen in order as long as the writer did not have
    /// to drop them. See [`reader_advance_latest`](Self::reader_advance_latest)
    /// to skip straight to the newest.
    ///
    /// # Returns
    /// - `0` if a new value is exposed by [`reading`](Self::reading).
    /// - `n < 0` if nothing has ever been published: `-1`, `-2`, ... on
    ///   consecutive calls.
    /// - `n > 0` if values were received before but nothing new has been
    ///   published since: `1`, `2`, ... on consecutive calls.
    ///
    /// The count saturates instead of wrapping. When stale the held slot is
    /// unchanged. Never blocks.
    #[inline]
    pub fn reader_advance(&mut self) -> i32 {
        let state = &mut *self.state;

        // Caught up with the last writer position we know of: refresh it.
        if state.next == state.writer {
            state.writer = self.shared.writing_pos.load(Ordering::Acquire);
            if state.next == state.writer {
                return state.stale();
            }
        }

        // Release: our reads of the old slot happen before the writer may
        // reuse it.
        self.shared.reading_pos.store(state.next, Ordering::Release);
        state.reading = state.next;
        state.next = incr_mod(state.next, self.size);
        state.fresh()
    }

    /// Releases the held slot and takes the newest published one, skipping
    /// any older unread values.
    ///
    /// Always reloads the writer's cursor. All skipped slots go back to the
    /// writer at once. Returns the same staleness codes as
    /// [`reader_advance`](Self::reader_advance).
    #[inline]
    pub fn reader_advance_latest(&mut self) -> i32 {
        let state = &mut *self.state;

        state.writer = self.shared.writing_pos.load(Ordering::Acquire);
        if state.next == state.writer {
            return state.stale();
        }

        let newest = decr_mod(state.writer, self.size);
        self.shared.reading_pos.store(newest, Ordering::Release);
        state.reading = newest;
        state.next = state.writer;
        state.fresh()
    }

    /// Advances and returns a copy of the held value.
    ///
    /// When stale this is the previous value again.
    #[inline]
    pub fn get(&mut self) -> T
    where
        T: Clone,
    {
        self.reader_advance();
        self.reading().clone()
    }

    /// Advances and returns a copy of the held value with the staleness code.
    #[inline]
    pub fn get_with_staleness(&mut self) -> (T, i32)
    where
        T: Clone,
    {
        let staleness = self.reader_advance();
        (self.reading().clone(), staleness)
    }

    /// Advances and moves the held value out, leaving `T::default()` behind.
    ///
    /// The move happens whether or not the advance succeeded, so a stale pop
    /// right after a successful one returns `T::default()`.
    #[inline]
    pub fn pop(&mut self) -> (T, i32)
    where
        T: Default,
    {
        let staleness = self.reader_advance();
        (mem::take(self.reading_mut()), staleness)
    }

    /// Staleness returned by the last advance.
    #[inline]
    pub fn staleness(&self) -> i32 {
        self.state.stale_cnt
    }

    /// Whether any advance has ever succeeded.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl<T> fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("state", &*self.state)
            .field("size", &self.size)
            .finish()
    }
}
