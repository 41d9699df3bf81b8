//! Small numeric and time helpers shared by the engine.

use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Non-negative integer division rounded to nearest, ties to even.
/// A zero denominator yields 0.
#[inline]
pub fn div_round_half_even(num: u64, den: u64) -> u64 {
    if den == 0 {
        return 0;
    }
    let q = num / den;
    let r = num % den;
    match (2 * r).cmp(&den) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q & 1),
    }
}

/// Mean of percentage samples rounded to nearest (ties to even).
/// Returns None for an empty input.
pub fn mean_round_u8(values: impl IntoIterator<Item = u8>) -> Option<u8> {
    let (sum, n) = values
        .into_iter()
        .fold((0u64, 0u64), |(s, n), v| (s + u64::from(v), n + 1));
    if n == 0 {
        return None;
    }
    // The mean of u8 values always fits in u8.
    u8::try_from(div_round_half_even(sum, n)).ok()
}

/// Duration from a millisecond count.
#[inline]
pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_ties_to_even() {
        assert_eq!(div_round_half_even(81, 2), 40); // 40.5
        assert_eq!(div_round_half_even(83, 2), 42); // 41.5
        assert_eq!(div_round_half_even(121, 3), 40); // 40.33
        assert_eq!(div_round_half_even(122, 3), 41); // 40.67
        assert_eq!(div_round_half_even(5, 0), 0);
    }

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean_round_u8([40, 41, 40]), Some(40));
        assert_eq!(mean_round_u8([40, 41]), Some(40));
        assert_eq!(mean_round_u8([41, 42]), Some(42));
        assert_eq!(mean_round_u8([255, 255]), Some(255));
        assert_eq!(mean_round_u8(std::iter::empty()), None);
    }
}
