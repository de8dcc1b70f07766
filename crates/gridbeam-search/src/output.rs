//! What a search hands back.

use gridbeam_core::Hypothesis;

use crate::oracle::DecoderOracle;

/// Where the returned hypothesis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// It reached the stop token as a valid final result.
    Completed,
    /// Nothing completed; it is the best of the last live beam.
    Fallback,
}

/// Counters collected while searching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Decode steps run.
    pub steps: usize,
    /// Decoder invocations.
    pub oracle_calls: usize,
    /// Hypotheses accepted as final results.
    pub completed: usize,
    /// Branches dropped because a forced constraint token was unreachable.
    pub dropped_branches: usize,
}

/// The selected hypothesis plus bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchOutput<S, A, C> {
    pub hypothesis: Hypothesis<S, A, C>,
    pub origin: Origin,
    pub stats: SearchStats,
}

impl<S, A, C> SearchOutput<S, A, C> {
    /// Check if the hypothesis finished with a stop token.
    pub fn is_completed(&self) -> bool {
        self.origin == Origin::Completed
    }

    /// Generated token ids, without the start token.
    pub fn generated(&self) -> &[u32] {
        &self.hypothesis.tokens()[1..]
    }
}

/// Search output type for oracle `O`.
pub type OracleOutput<O> = SearchOutput<
    <O as DecoderOracle>::State,
    <O as DecoderOracle>::Attention,
    <O as DecoderOracle>::Coverage,
>;
