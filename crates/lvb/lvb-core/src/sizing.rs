//! Rule of thumb for sizing the slack of a buffer.

use crate::ring::MAX_SLACK;

/// Recommended slack for a producer running `ratio` times faster than the
/// consumer.
///
/// Keeps a 20% reserve for rate unreliability plus two slots for cache
/// effects: `ceil(ratio * 1.2) + 2`. The product is computed as
/// `ratio * 6 / 5` so integral ratios round exactly.
///
/// Advisory only. NaN or non-positive ratios give the floor value `2`.
/// Ratios too large to size, `+inf` included, clamp to
/// [`MAX_SLACK`](crate::MAX_SLACK).
///
/// ```
/// use lvb_core::slack_of_prod_ratio;
/// assert_eq!(slack_of_prod_ratio(1.0), 4);
/// assert_eq!(slack_of_prod_ratio(10.0), 14);
/// ```
pub fn slack_of_prod_ratio(ratio: f64) -> usize {
    if ratio.is_nan() || ratio <= 0.0 {
        return 2;
    }
    // `as` saturates, so absurd ratios clamp instead of wrapping.
    ((ratio * 6.0 / 5.0).ceil() as usize)
        .saturating_add(2)
        .min(MAX_SLACK)
}

#[cfg(test)]
mod tests {
    use super::slack_of_prod_ratio;
    use crate::ring::MAX_SLACK;

    #[test]
    fn integral_ratios() {
        assert_eq!(slack_of_prod_ratio(1.0), 4);
        assert_eq!(slack_of_prod_ratio(2.0), 5);
        assert_eq!(slack_of_prod_ratio(5.0), 8);
        assert_eq!(slack_of_prod_ratio(10.0), 14);
        assert_eq!(slack_of_prod_ratio(100.0), 122);
    }

    #[test]
    fn fractional_ratios_round_up() {
        assert_eq!(slack_of_prod_ratio(0.5), 3);
        assert_eq!(slack_of_prod_ratio(2.5), 5);
    }

    #[test]
    fn degenerate_ratios_floor_at_two() {
        assert_eq!(slack_of_prod_ratio(0.0), 2);
        assert_eq!(slack_of_prod_ratio(-3.0), 2);
        assert_eq!(slack_of_prod_ratio(f64::NAN), 2);
        assert_eq!(slack_of_prod_ratio(f64::NEG_INFINITY), 2);
    }

    #[test]
    fn huge_ratios_clamp_to_max_slack() {
        assert_eq!(slack_of_prod_ratio(1e300), MAX_SLACK);
        assert_eq!(slack_of_prod_ratio(f64::INFINITY), MAX_SLACK);
        assert_eq!(slack_of_prod_ratio(1.8446744073709552e19), MAX_SLACK);
    }
}
