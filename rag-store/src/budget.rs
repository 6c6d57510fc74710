//! Greedy cumulative token budget over ranked chunks.

/// Keeps the ranked prefix whose running token sum stays within `budget`.
///
/// Items must already be ordered by distance ascending. The sum is inclusive
/// of the current item and the first item that overflows ends the prefix, so
/// a nearest chunk that alone exceeds the budget yields nothing.
pub fn take_within_budget<T>(
    ranked: impl IntoIterator<Item = T>,
    budget: i64,
    tokens: impl Fn(&T) -> i64,
) -> Vec<T> {
    let mut cumulative = 0i64;
    ranked
        .into_iter()
        .take_while(|item| {
            cumulative += tokens(item);
            cumulative <= budget
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_prefix_under_budget() {
        let kept = take_within_budget([500, 600, 700], 1700, |t| *t);
        assert_eq!(kept, vec![500, 600]);
    }

    #[test]
    fn exact_budget_is_inclusive() {
        let kept = take_within_budget([1000, 700, 1], 1700, |t| *t);
        assert_eq!(kept, vec![1000, 700]);
    }

    #[test]
    fn oversized_nearest_chunk_yields_empty() {
        let kept = take_within_budget([1800, 10], 1700, |t| *t);
        assert!(kept.is_empty());
    }

    #[test]
    fn stops_at_first_overflow() {
        // A later small chunk would still fit, but the cut is greedy.
        let kept = take_within_budget([900, 900, 100], 1700, |t| *t);
        assert_eq!(kept, vec![900]);
    }
}
