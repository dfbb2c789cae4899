//! Selection-based median
//!
//! Uses `select_nth_unstable` instead of a full sort: O(n) on average, and
//! the per-worker series can hold millions of samples.

/// Median of `values`, reordering the slice in place.
///
/// Odd length gives the middle element. Even length gives the integer mean of
/// the two middle elements, rounded down. Returns `None` for an empty slice.
pub fn median_in_place(values: &mut [u64]) -> Option<u64> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    let (lower, &mut upper, _) = values.select_nth_unstable(mid);
    if n % 2 == 1 {
        return Some(upper);
    }

    // Everything left of `mid` is <= upper; its maximum is the other middle.
    let below = lower.iter().copied().max().unwrap_or(upper);
    Some(((u128::from(below) + u128::from(upper)) / 2) as u64)
}
