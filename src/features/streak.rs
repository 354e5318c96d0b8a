//! Longest directional streak.

use crate::flow::Direction;

/// Length of the longest run of consecutive `target` entries.
///
/// Single forward pass, O(n) time and O(1) space. Returns 0 for an empty
/// sequence.
///
/// # Example
///
/// ```
/// use stream_feature_extractor::features::streak::longest_streak;
/// use stream_feature_extractor::flow::Direction::{Received as R, Sent as S};
///
/// assert_eq!(longest_streak([S, R, R, R, S, R], R), 3);
/// assert_eq!(longest_streak([S, R, S], S), 1);
/// ```
pub fn longest_streak<I>(dirs: I, target: Direction) -> usize
where
    I: IntoIterator<Item = Direction>,
{
    let mut longest = 0;
    let mut current = 0;

    for dir in dirs {
        if dir == target {
            current += 1;
        } else {
            longest = longest.max(current);
            current = 0;
        }
    }

    longest.max(current)
}
