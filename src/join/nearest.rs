//! Nearest-timestamp search

use chrono::{DateTime, Duration, Utc};

/// Index of the timestamp closest to `target` and its absolute distance
///
/// `times` must be sorted ascending. When two timestamps are equally far
/// away the earlier one wins.
#[must_use]
pub fn find_nearest(times: &[DateTime<Utc>], target: DateTime<Utc>) -> Option<(usize, Duration)> {
    let split = times.partition_point(|t| *t < target);

    let before = split.checked_sub(1).map(|i| (i, target - times[i]));
    let after = times.get(split).map(|t| (split, *t - target));

    match (before, after) {
        (Some(b), Some(a)) => Some(if b.1 <= a.1 { b } else { a }),
        (Some(b), None) => Some(b),
        (None, a) => a,
    }
}
