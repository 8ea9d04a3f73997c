//! Latest-value buffer: a lock-free single-producer, single-consumer ring
//! that always lets the reader see the most recently completed value.
//!
//! # Quick start
//! ```
//! use lvb_core::{Lvb, ReadStaleness, RingConfig, slack_of_prod_ratio};
//!
//! // Producer expected to run about 3x faster than the consumer.
//! let cfg = RingConfig::new(slack_of_prod_ratio(3.0));
//! let (mut writer, mut reader) = Lvb::<u64>::with_config(cfg).split();
//!
//! assert_eq!(ReadStaleness::from(reader.reader_advance()), ReadStaleness::AwaitingFirst(1));
//!
//! writer.put(1);
//! writer.put(2);
//! assert_eq!(reader.reader_advance_latest(), 0);
//! assert_eq!(*reader.reading(), 2);
//! ```
//!
//! # Semantics
//! - Neither side ever blocks. Failure to advance is reported as a staleness
//!   count, not an error.
//! - Writer staleness (`u32`) counts consecutive publishes refused because the
//!   ring is full.
//! - Reader staleness (`i32`) is negative until the first value arrives and
//!   positive once the stream has gone idle after at least one value.
//! - Intermediate values may be dropped; only the eventual visibility of the
//!   latest published value is guaranteed.

mod lvb;
mod ring;
mod sizing;
mod slot;
mod staleness;
pub mod spin;

pub use lvb::{Lvb, Reader, Writer};
pub use ring::{DEFAULT_SLACK, MAX_SLACK, RingConfig, decr_mod, incr_mod};
pub use sizing::slack_of_prod_ratio;
pub use slot::CACHE_LINE_SIZE;
pub use staleness::ReadStaleness;
