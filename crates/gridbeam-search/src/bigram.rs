//! Table-driven bigram decoder.
//!
//! Scores the next token from the previous one using fixed log-probability
//! rows. It needs no encoder and carries only step counters as state, which
//! makes search behaviour fully predictable.

use std::collections::HashMap;

use thiserror::Error;

use crate::oracle::{DecoderOracle, Encoded, StepOutput};

/// Failures of [`BigramOracle`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BigramError {
    /// Failure injected with [`BigramOracle::fail_after`].
    #[error("bigram oracle failed on call {0}")]
    Injected(usize),

    /// The batch held no rows.
    #[error("empty decode batch")]
    EmptyBatch,
}

/// Bigram log-probability table.
#[derive(Debug, Clone, Default)]
pub struct BigramOracle {
    rows: HashMap<u32, Vec<(u32, f32)>>,
    /// Row used for previous tokens without an entry.
    default_row: Vec<(u32, f32)>,
    fail_after: Option<usize>,
    /// Latest-token batches seen, one entry per call.
    history: Vec<Vec<u32>>,
}

/// Sort candidates most likely first, keeping table order on ties.
fn ranked(mut row: Vec<(u32, f32)>) -> Vec<(u32, f32)> {
    row.sort_by(|a, b| b.1.total_cmp(&a.1));
    row
}

impl BigramOracle {
    /// Create an oracle that answers every previous token with `default_row`.
    pub fn new(default_row: Vec<(u32, f32)>) -> Self {
        Self {
            default_row: ranked(default_row),
            ..Self::default()
        }
    }

    /// Set the candidates that follow `prev`.
    pub fn with_row(mut self, prev: u32, row: Vec<(u32, f32)>) -> Self {
        self.rows.insert(prev, ranked(row));
        self
    }

    /// Fail every call after the first `calls` succeed.
    pub fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Number of decode steps served.
    pub fn calls(&self) -> usize {
        self.history.len()
    }

    /// Latest-token batches received, in call order.
    pub fn history(&self) -> &[Vec<u32>] {
        &self.history
    }

    fn row(&self, prev: u32) -> &[(u32, f32)] {
        self.rows.get(&prev).unwrap_or(&self.default_row)
    }
}

impl DecoderOracle for BigramOracle {
    type EncoderStates = ();
    /// Steps taken by the hypothesis.
    type State = usize;
    /// The token attended to, i.e. the previous token.
    type Attention = u32;
    /// Running step count.
    type Coverage = usize;
    type Error = BigramError;

    fn encode(&mut self) -> Result<Encoded<(), usize, usize>, BigramError> {
        Ok(Encoded {
            encoder_states: (),
            state: 0,
            coverage: 0,
        })
    }

    fn decode_step(
        &mut self,
        _encoder_states: &(),
        latest_tokens: &[u32],
        states: &[usize],
        prev_coverage: &[usize],
        top_k: usize,
    ) -> Result<StepOutput<usize, u32, usize>, BigramError> {
        if self.fail_after.is_some_and(|n| self.history.len() >= n) {
            return Err(BigramError::Injected(self.history.len()));
        }
        if latest_tokens.is_empty() {
            return Err(BigramError::EmptyBatch);
        }
        self.history.push(latest_tokens.to_vec());

        let rows = latest_tokens.len();
        let mut output = StepOutput {
            top_ids: Vec::with_capacity(rows),
            top_log_probs: Vec::with_capacity(rows),
            states: Vec::with_capacity(rows),
            attn_dists: Vec::with_capacity(rows),
            p_gens: Vec::with_capacity(rows),
            coverage: Vec::with_capacity(rows),
        };
        for (i, &prev) in latest_tokens.iter().enumerate() {
            let candidates = self.row(prev);
            output
                .top_ids
                .push(candidates.iter().take(top_k).map(|c| c.0).collect());
            output
                .top_log_probs
                .push(candidates.iter().take(top_k).map(|c| c.1).collect());
            output.states.push(states.get(i).copied().unwrap_or(0) + 1);
            output.attn_dists.push(prev);
            output.p_gens.push(1.0);
            output
                .coverage
                .push(prev_coverage.get(i).copied().unwrap_or(0) + 1);
        }
        Ok(output)
    }
}
