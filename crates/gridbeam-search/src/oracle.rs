//! The decoder interface the search drives.

use gridbeam_core::{Extension, Hypothesis};

/// Result of encoding the source once per search.
#[derive(Debug, Clone)]
pub struct Encoded<E, S, C> {
    /// Encoder outputs passed back on every decode step.
    pub encoder_states: E,
    /// Initial decoder state.
    pub state: S,
    /// Initial coverage vector.
    pub coverage: C,
}

/// Output of one batched decode step, one entry per batch row.
#[derive(Debug, Clone)]
pub struct StepOutput<S, A, C> {
    /// Candidate next-token ids per row, most likely first.
    pub top_ids: Vec<Vec<u32>>,
    /// Log probabilities matching `top_ids`.
    pub top_log_probs: Vec<Vec<f32>>,
    /// Updated decoder state per row.
    pub states: Vec<S>,
    /// Attention distribution per row.
    pub attn_dists: Vec<A>,
    /// Generation probability per row.
    pub p_gens: Vec<f32>,
    /// Updated coverage per row.
    pub coverage: Vec<C>,
}

impl<S, A, C> StepOutput<S, A, C> {
    /// Number of complete rows.
    pub fn rows(&self) -> usize {
        self.top_ids
            .len()
            .min(self.top_log_probs.len())
            .min(self.states.len())
            .min(self.attn_dists.len())
            .min(self.p_gens.len())
            .min(self.coverage.len())
    }

    /// Drop every row from `rows` onwards.
    pub fn truncate(&mut self, rows: usize) {
        self.top_ids.truncate(rows);
        self.top_log_probs.truncate(rows);
        self.states.truncate(rows);
        self.attn_dists.truncate(rows);
        self.p_gens.truncate(rows);
        self.coverage.truncate(rows);
    }

    /// Number of candidates offered for `row`.
    pub fn candidates(&self, row: usize) -> usize {
        self.top_ids.get(row).map_or(0, Vec::len)
    }

    /// Column of `token` among the candidates of `row`.
    pub fn position_of(&self, row: usize, token: u32) -> Option<usize> {
        self.top_ids.get(row)?.iter().position(|&id| id == token)
    }
}

impl<S: Clone, A: Clone, C: Clone> StepOutput<S, A, C> {
    /// Extension data for candidate `col` of `row`.
    ///
    /// Callers stay within `rows()` and `candidates(row)`; the batch layer
    /// checks both before handing the output to the search.
    pub fn extension(&self, row: usize, col: usize) -> Extension<S, A, C> {
        Extension {
            token: self.top_ids[row][col],
            log_prob: self.top_log_probs[row][col],
            state: self.states[row].clone(),
            attn_dist: self.attn_dists[row].clone(),
            p_gen: self.p_gens[row],
            coverage: self.coverage[row].clone(),
        }
    }
}

/// A sequence model exposed one decode step at a time.
///
/// The search never inspects the associated types; it only stores them in
/// hypotheses and hands them back on the next call.
pub trait DecoderOracle {
    /// Encoder outputs, computed once.
    type EncoderStates;
    /// Recurrent decoder state.
    type State: Clone;
    /// Attention distribution produced on each step.
    type Attention: Clone;
    /// Coverage vector accumulated across steps.
    type Coverage: Clone;
    /// Failure inside the model.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Encode the source and produce the initial decoder state.
    fn encode(
        &mut self,
    ) -> Result<Encoded<Self::EncoderStates, Self::State, Self::Coverage>, Self::Error>;

    /// Run one decode step for a batch of hypotheses.
    ///
    /// `latest_tokens`, `states` and `prev_coverage` have one entry per batch
    /// row. Each output row holds at most `top_k` candidates.
    fn decode_step(
        &mut self,
        encoder_states: &Self::EncoderStates,
        latest_tokens: &[u32],
        states: &[Self::State],
        prev_coverage: &[Self::Coverage],
        top_k: usize,
    ) -> Result<StepOutput<Self::State, Self::Attention, Self::Coverage>, Self::Error>;
}

/// Hypothesis type produced when searching with oracle `O`.
pub type OracleHypothesis<O> = Hypothesis<
    <O as DecoderOracle>::State,
    <O as DecoderOracle>::Attention,
    <O as DecoderOracle>::Coverage,
>;

/// Step output type produced by oracle `O`.
pub type OracleStep<O> = StepOutput<
    <O as DecoderOracle>::State,
    <O as DecoderOracle>::Attention,
    <O as DecoderOracle>::Coverage,
>;

/// Encoding type produced by oracle `O`.
pub type OracleEncoding<O> = Encoded<
    <O as DecoderOracle>::EncoderStates,
    <O as DecoderOracle>::State,
    <O as DecoderOracle>::Coverage,
>;
