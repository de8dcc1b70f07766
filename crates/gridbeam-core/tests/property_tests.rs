//! Property-based tests for gridbeam-core.
//!
//! Key invariants:
//! - avg_log_prob is the log-prob sum divided by the token count
//! - Ranking is descending and idempotent
//! - Trackers only leave the pending list through completed phrases
//! - emitted always equals the number of forced tokens

use std::sync::Arc;

use gridbeam_core::{
    select_ranked, sort_hypotheses, ConstraintPhase, ConstraintSet, ConstraintTracker, Extension,
    Hypothesis,
};
use proptest::prelude::*;

fn hyp(log_probs: &[f32]) -> Hypothesis<(), (), ()> {
    let mut h = Hypothesis::start(1, (), (), ConstraintTracker::unconstrained());
    for (i, &log_prob) in log_probs.iter().enumerate() {
        let step = Extension {
            token: i as u32 + 4,
            log_prob,
            state: (),
            attn_dist: (),
            p_gen: 1.0,
            coverage: (),
        };
        h = h.extend(step, h.tracker().clone());
    }
    h
}

fn log_probs() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-20.0f32..0.0, 0..12)
}

fn phrases() -> impl Strategy<Value = Vec<Vec<u32>>> {
    prop::collection::vec(prop::collection::vec(4u32..40, 1..4), 1..4)
}

proptest! {
    /// avg_log_prob == sum(log_probs) / len(tokens).
    #[test]
    fn avg_log_prob_identity(lps in log_probs()) {
        let h = hyp(&lps);
        let sum: f32 = h.log_probs().iter().sum();
        prop_assert_eq!(h.avg_log_prob(), sum / h.tokens().len() as f32);
        prop_assert_eq!(h.tokens().len(), h.log_probs().len());
        prop_assert_eq!(h.attn_dists().len() + 1, h.tokens().len());
    }

    /// Sorting is descending and sorting twice changes nothing.
    #[test]
    fn sort_descending_and_idempotent(all in prop::collection::vec(log_probs(), 0..10)) {
        let once = sort_hypotheses(all.iter().map(|lps| hyp(lps)).collect());
        for pair in once.windows(2) {
            prop_assert!(pair[0].avg_log_prob() >= pair[1].avg_log_prob());
        }

        let once_tokens: Vec<Vec<u32>> = once.iter().map(|h| h.tokens().to_vec()).collect();
        let twice = sort_hypotheses(once);
        let twice_tokens: Vec<Vec<u32>> = twice.iter().map(|h| h.tokens().to_vec()).collect();
        prop_assert_eq!(once_tokens, twice_tokens);
    }

    /// The selected entry is never worse than any later entry.
    #[test]
    fn select_ranked_in_bounds(all in prop::collection::vec(log_probs(), 1..10), rank in 0usize..12) {
        let sorted = sort_hypotheses(all.iter().map(|lps| hyp(lps)).collect());
        let last = sorted.len() - 1;
        let expected = sorted[rank.min(last)].tokens().to_vec();
        let picked = select_ranked(sorted, rank).unwrap();
        prop_assert_eq!(picked.tokens(), expected.as_slice());
    }

    /// Writing phrases in any order satisfies the tracker after exactly
    /// grid_height forced tokens.
    #[test]
    fn tracker_completes_after_grid_height(phrases in phrases(), seed in any::<u64>()) {
        let set = Arc::new(ConstraintSet::new(phrases).unwrap());
        let height = set.grid_height();
        let mut tracker = ConstraintTracker::new(Arc::clone(&set));
        let mut written = Vec::new();
        let mut pick = seed;

        while !tracker.is_satisfied() {
            let (token, next) = match tracker.phase() {
                ConstraintPhase::MidPhrase { .. } => tracker.advance().unwrap(),
                ConstraintPhase::AwaitingStart => {
                    let startable = tracker.startable();
                    let phrase = startable[(pick % startable.len() as u64) as usize];
                    pick = pick.rotate_left(7) ^ 0x9e37_79b9;
                    tracker.start(phrase).unwrap()
                }
                ConstraintPhase::Free => unreachable!("unsatisfied tracker is never free"),
            };
            written.push(token);
            prop_assert_eq!(next.emitted(), written.len());
            prop_assert!(next.emitted() <= height);
            tracker = next;
        }

        prop_assert_eq!(written.len(), height);
        prop_assert_eq!(tracker.phase(), ConstraintPhase::Free);
        for phrase in set.phrases() {
            prop_assert!(written.windows(phrase.len()).any(|w| w == phrase.as_slice()));
        }
    }
}
