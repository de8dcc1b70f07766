//! Ordering of hypotheses by length-normalised log probability.

use crate::hypothesis::Hypothesis;

/// Sort hypotheses by descending `avg_log_prob`.
///
/// The sort is stable: equal scores keep the order they were produced in.
pub fn sort_hypotheses<S, A, C>(mut hyps: Vec<Hypothesis<S, A, C>>) -> Vec<Hypothesis<S, A, C>> {
    hyps.sort_by(|a, b| b.avg_log_prob().total_cmp(&a.avg_log_prob()));
    hyps
}

/// Take the entry at `rank` from a sorted list.
///
/// Falls back to the last entry when fewer than `rank + 1` exist. Returns
/// `None` only for an empty list.
pub fn select_ranked<T>(sorted: Vec<T>, rank: usize) -> Option<T> {
    let idx = rank.min(sorted.len().checked_sub(1)?);
    sorted.into_iter().nth(idx)
}
