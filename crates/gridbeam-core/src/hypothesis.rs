//! Partial output sequences explored by the search.

use crate::constraint::ConstraintTracker;

/// Model output consumed by one extension of a hypothesis.
///
/// `S`, `A` and `C` are the decoder's state, attention distribution and
/// coverage vector. The search threads them through without looking inside.
#[derive(Debug, Clone)]
pub struct Extension<S, A, C> {
    pub token: u32,
    pub log_prob: f32,
    pub state: S,
    pub attn_dist: A,
    pub p_gen: f32,
    pub coverage: C,
}

/// A partial output sequence plus its constraint progress.
///
/// Hypotheses are never mutated; [`Hypothesis::extend`] builds a new one.
/// The first token is always the start token, which has no attention
/// distribution or generation probability, so
/// `tokens.len() == log_probs.len() == attn_dists.len() + 1 == p_gens.len() + 1`.
#[derive(Debug, Clone)]
pub struct Hypothesis<S, A = (), C = ()> {
    tokens: Vec<u32>,
    log_probs: Vec<f32>,
    state: S,
    attn_dists: Vec<A>,
    p_gens: Vec<f32>,
    coverage: C,
    tracker: ConstraintTracker,
}

impl<S, A, C> Hypothesis<S, A, C> {
    /// Root hypothesis holding only the start token.
    pub fn start(start_id: u32, state: S, coverage: C, tracker: ConstraintTracker) -> Self {
        Self {
            tokens: vec![start_id],
            log_probs: vec![0.0],
            state,
            attn_dists: Vec::new(),
            p_gens: Vec::new(),
            coverage,
            tracker,
        }
    }

    /// Token ids so far, starting with the start token.
    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    /// Per-token log probabilities.
    pub fn log_probs(&self) -> &[f32] {
        &self.log_probs
    }

    /// Latest decoder state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Attention distributions, one per generated token.
    pub fn attn_dists(&self) -> &[A] {
        &self.attn_dists
    }

    /// Generation probabilities, one per generated token.
    pub fn p_gens(&self) -> &[f32] {
        &self.p_gens
    }

    /// Latest coverage vector.
    pub fn coverage(&self) -> &C {
        &self.coverage
    }

    /// Constraint progress.
    pub fn tracker(&self) -> &ConstraintTracker {
        &self.tracker
    }

    /// Most recently produced token.
    #[inline]
    pub fn latest_token(&self) -> u32 {
        // tokens always holds at least the start token
        self.tokens[self.tokens.len() - 1]
    }

    /// Number of tokens including the start token.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always `false`: a hypothesis holds at least the start token.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of decode steps taken.
    pub fn steps(&self) -> usize {
        self.tokens.len() - 1
    }

    /// Sum of the per-token log probabilities.
    pub fn log_prob(&self) -> f32 {
        self.log_probs.iter().sum()
    }

    /// Length-normalised log probability, the ranking signal.
    pub fn avg_log_prob(&self) -> f32 {
        self.log_prob() / self.tokens.len() as f32
    }

    /// Check if every constraint phrase has been written.
    pub fn is_constraint_satisfied(&self) -> bool {
        self.tracker.is_satisfied()
    }

    /// Build the hypothesis one step further along.
    ///
    /// Token, log-prob, attention and `p_gen` are appended; state, coverage
    /// and `tracker` are taken as given.
    pub fn extend(&self, step: Extension<S, A, C>, tracker: ConstraintTracker) -> Self
    where
        A: Clone,
    {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(step.token);

        let mut log_probs = Vec::with_capacity(self.log_probs.len() + 1);
        log_probs.extend_from_slice(&self.log_probs);
        log_probs.push(step.log_prob);

        let mut attn_dists = Vec::with_capacity(self.attn_dists.len() + 1);
        attn_dists.extend(self.attn_dists.iter().cloned());
        attn_dists.push(step.attn_dist);

        let mut p_gens = Vec::with_capacity(self.p_gens.len() + 1);
        p_gens.extend_from_slice(&self.p_gens);
        p_gens.push(step.p_gen);

        Self {
            tokens,
            log_probs,
            state: step.state,
            attn_dists,
            p_gens,
            coverage: step.coverage,
            tracker,
        }
    }
}
