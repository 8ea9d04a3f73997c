//! Typed view of the reader's signed staleness code.

/// What a reader staleness code says about the stream.
///
/// | code  | meaning                                   |
/// |-------|-------------------------------------------|
/// | `0`   | a new value is exposed                    |
/// | `< 0` | no value has ever been received           |
/// | `> 0` | values were received, the stream is idle  |
///
/// The payload is the run length of consecutive failed advances.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadStaleness {
    Fresh,
    AwaitingFirst(u32),
    Idle(u32),
}

impl ReadStaleness {
    #[inline]
    pub fn is_fresh(&self) -> bool {
        matches!(self, ReadStaleness::Fresh)
    }

    /// Consecutive failed advances, `0` when fresh.
    #[inline]
    pub fn run_length(&self) -> u32 {
        match *self {
            ReadStaleness::Fresh => 0,
            ReadStaleness::AwaitingFirst(n) | ReadStaleness::Idle(n) => n,
        }
    }
}

impl From<i32> for ReadStaleness {
    #[inline]
    fn from(code: i32) -> Self {
        match code {
            0 => ReadStaleness::Fresh,
            c if c < 0 => ReadStaleness::AwaitingFirst(c.unsigned_abs()),
            c => ReadStaleness::Idle(c as u32),
        }
    }
}
