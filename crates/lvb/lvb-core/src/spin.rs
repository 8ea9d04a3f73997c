//! Caller-side waiting built on the non-blocking advance primitives.
//!
//! Nothing in [`Writer`] or [`Reader`] ever waits. These helpers retry an
//! advance a bounded number of times (or until a deadline), yielding the CPU
//! between attempts, for callers that do want to wait.

use crate::lvb::{Reader, Writer};
use std::time::{Duration, Instant};
use tracing::debug;

/// Calls `attempt` until it returns `true`, at most `max_attempts` times,
/// yielding between attempts.
///
/// Returns whether an attempt succeeded.
pub fn retry_with_yield<F: FnMut() -> bool>(max_attempts: u32, mut attempt: F) -> bool {
    for n in 0..max_attempts {
        if attempt() {
            return true;
        }
        if n + 1 < max_attempts {
            std::thread::yield_now();
        }
    }
    false
}

/// Retries [`Reader::reader_advance`] until a new value is exposed.
pub fn spin_until_read<T>(reader: &mut Reader<T>, max_attempts: u32) -> bool {
    let advanced = retry_with_yield(max_attempts, || reader.reader_advance() == 0);
    if !advanced {
        debug!(
            max_attempts,
            staleness = reader.staleness(),
            "reader gave up waiting for a new value"
        );
    }
    advanced
}

/// Retries [`Writer::writer_advance`] until the current writing slot is
/// published.
///
/// The slot is not rewritten between attempts, so whatever it holds is what
/// gets published.
pub fn spin_until_written<T>(writer: &mut Writer<T>, max_attempts: u32) -> bool {
    let advanced = retry_with_yield(max_attempts, || writer.writer_advance() == 0);
    if !advanced {
        debug!(
            max_attempts,
            staleness = writer.staleness(),
            "writer gave up waiting for a free slot"
        );
    }
    advanced
}

/// Retries [`Reader::reader_advance`] until a new value is exposed or
/// `timeout` has elapsed. At least one attempt is always made.
pub fn spin_until_read_for<T>(reader: &mut Reader<T>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if reader.reader_advance() == 0 {
            return true;
        }
        if Instant::now() >= deadline {
            debug!(
                ?timeout,
                staleness = reader.staleness(),
                "reader timed out waiting for a new value"
            );
            return false;
        }
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lvb;

    #[test]
    fn retry_stops_on_first_success() {
        let mut calls = 0;
        assert!(retry_with_yield(10, || {
            calls += 1;
            calls == 3
        }));
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_respects_bound() {
        let mut calls = 0;
        assert!(!retry_with_yield(5, || {
            calls += 1;
            false
        }));
        assert_eq!(calls, 5);
        assert!(!retry_with_yield(0, || unreachable!()));
    }

    #[test]
    fn read_spin_fails_on_empty_buffer() {
        let (_w, mut r) = Lvb::<u32>::new().split();
        assert!(!spin_until_read(&mut r, 4));
        assert_eq!(r.staleness(), -4);
    }

    #[test]
    fn read_spin_succeeds_once_published() {
        let (mut w, mut r) = Lvb::<u32>::new().split();
        w.put(8);
        assert!(spin_until_read(&mut r, 4));
        assert_eq!(*r.reading(), 8);
    }

    #[test]
    fn write_spin_publishes_pending_slot_once_freed() {
        let (mut w, mut r) = Lvb::<u32>::new().split();
        w.put(1);
        w.put(2);
        assert_eq!(w.put(3), 1);
        assert!(!spin_until_written(&mut w, 3));
        assert_eq!(w.staleness(), 4);

        assert_eq!(r.reader_advance(), 0);
        assert!(spin_until_written(&mut w, 3));

        assert_eq!(r.get(), 2);
        assert_eq!(r.get(), 3);
    }

    #[test]
    fn timed_read_spin_times_out() {
        let (_w, mut r) = Lvb::<u32>::new().split();
        let start = Instant::now();
        assert!(!spin_until_read_for(&mut r, Duration::from_millis(5)));
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn timed_read_spin_with_zero_timeout_still_tries_once() {
        let (mut w, mut r) = Lvb::<u32>::new().split();
        w.put(3);
        assert!(spin_until_read_for(&mut r, Duration::ZERO));
    }
}
