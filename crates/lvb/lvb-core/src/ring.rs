//! Ring geometry and wrap-around index arithmetic.
//!
//! A latest-value buffer is a ring of `slack + 2` slots: two for the minimal
//! double buffer (one held by the reader, one being filled by the writer) and
//! `slack` more to absorb rate mismatch between the two sides.

use crate::sizing::slack_of_prod_ratio;

/// Slack used when none is given. Four slots in total.
pub const DEFAULT_SLACK: usize = 2;

/// Largest slack whose ring size, `slack + 2`, fits in a `usize`.
pub const MAX_SLACK: usize = usize::MAX - 2;

/// Geometry of a latest-value buffer.
///
/// The slack is fixed at construction and never changes for the lifetime of
/// the buffer. There is no power-of-two requirement on the resulting size.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Slots beyond the minimal double buffer.
    slack: usize,
}

impl RingConfig {
    /// Creates a ring configuration with the given slack.
    ///
    /// # Panics
    /// Panics if `slack` is zero. With only two slots the writer's next slot
    /// is the reader's held slot from the start and neither side could ever
    /// advance. Also panics above [`MAX_SLACK`].
    ///
    /// # Example
    /// ```
    /// use lvb_core::RingConfig;
    /// let cfg = RingConfig::new(3);
    /// assert_eq!(cfg.size(), 5);
    /// ```
    pub fn new(slack: usize) -> Self {
        assert!(slack >= 1, "slack must be at least 1");
        assert!(slack <= MAX_SLACK, "slack must be at most usize::MAX - 2");
        Self { slack }
    }

    /// Sizes the ring for an expected producer:consumer rate ratio.
    ///
    /// See [`slack_of_prod_ratio`].
    pub fn from_prod_ratio(ratio: f64) -> Self {
        Self::new(slack_of_prod_ratio(ratio))
    }

    #[inline(always)]
    pub fn slack(&self) -> usize {
        self.slack
    }

    /// Total number of slots, `slack + 2`.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.slack + 2
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SLACK)
    }
}

/// Next index in a ring of `size` slots.
///
/// ```text
/// size = 4
/// 0 → 1, 1 → 2, 2 → 3, 3 → 0
/// ```
#[inline(always)]
pub fn incr_mod(idx: usize, size: usize) -> usize {
    if idx + 1 >= size { 0 } else { idx + 1 }
}

/// Previous index in a ring of `size` slots.
#[inline(always)]
pub fn decr_mod(idx: usize, size: usize) -> usize {
    if idx == 0 { size - 1 } else { idx - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_slack_plus_two() {
        assert_eq!(RingConfig::new(1).size(), 3);
        assert_eq!(RingConfig::new(100).size(), 102);
        assert_eq!(RingConfig::default().size(), DEFAULT_SLACK + 2);
    }

    #[test]
    #[should_panic(expected = "slack must be at least 1")]
    fn zero_slack_is_rejected() {
        let _ = RingConfig::new(0);
    }

    #[test]
    #[should_panic(expected = "slack must be at most usize::MAX - 2")]
    fn slack_overflowing_size_is_rejected() {
        let _ = RingConfig::new(usize::MAX);
    }

    #[test]
    fn largest_slack_has_representable_size() {
        assert_eq!(RingConfig::new(MAX_SLACK).size(), usize::MAX);
    }

    #[test]
    fn from_prod_ratio_uses_sizing_rule() {
        assert_eq!(RingConfig::from_prod_ratio(1.0).slack(), 4);
        assert_eq!(RingConfig::from_prod_ratio(10.0).slack(), 14);
    }

    #[test]
    fn from_prod_ratio_never_overflows_size() {
        for ratio in [1e300, f64::MAX, f64::INFINITY] {
            let cfg = RingConfig::from_prod_ratio(ratio);
            assert_eq!(cfg.slack(), MAX_SLACK);
            assert_eq!(cfg.size(), usize::MAX);
        }
    }

    #[test]
    fn index_arithmetic_wraps() {
        let size = 4;
        let forward: Vec<usize> = (0..size).map(|i| incr_mod(i, size)).collect();
        assert_eq!(forward, [1, 2, 3, 0]);
        let backward: Vec<usize> = (0..size).map(|i| decr_mod(i, size)).collect();
        assert_eq!(backward, [3, 0, 1, 2]);
        for i in 0..size {
            assert_eq!(decr_mod(incr_mod(i, size), size), i);
        }
    }
}
