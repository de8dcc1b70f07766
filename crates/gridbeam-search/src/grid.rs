//! Grid beam search: beam search with lexical constraints.
//!
//! The frontier is indexed by `(step, emitted)`, where `emitted` counts the
//! constraint tokens written so far. A cell at step `i` is fed from two
//! predecessors:
//!
//! - `(i-1, j)` by free generation, for hypotheses with no phrase in flight
//! - `(i-1, j-1)` by forcing a constraint token, either the first token of a
//!   pending phrase or the next token of the phrase in flight
//!
//! Only hypotheses with every phrase written may finish with the stop token.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use gridbeam_core::{
    select_ranked, sort_hypotheses, ConstraintError, ConstraintPhase, ConstraintSet,
    ConstraintTracker, Hypothesis, SearchConfig,
};
use tracing::{debug, instrument, trace, warn};

use crate::batch::StepBatch;
use crate::error::SearchError;
use crate::oracle::{DecoderOracle, OracleEncoding, OracleHypothesis, OracleStep, StepOutput};
use crate::output::{OracleOutput, Origin, SearchOutput, SearchStats};
use crate::vocab::Vocabulary;

/// Frontier coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    /// Decode steps taken.
    pub step: usize,
    /// Constraint tokens emitted.
    pub emitted: usize,
}

impl Cell {
    pub fn new(step: usize, emitted: usize) -> Self {
        Self { step, emitted }
    }
}

/// Sparse map from [`Cell`] to a ranked beam.
///
/// Only non-empty beams are stored. The last populated cell is tracked
/// explicitly since the fallback result is drawn from it.
#[derive(Debug, Clone)]
pub struct Frontier<H> {
    cells: HashMap<Cell, Vec<H>>,
    last_populated: Option<Cell>,
}

impl<H> Default for Frontier<H> {
    fn default() -> Self {
        Self {
            cells: HashMap::new(),
            last_populated: None,
        }
    }
}

impl<H> Frontier<H> {
    /// Create an empty frontier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the beam for `cell`. Empty beams are not stored.
    pub fn insert(&mut self, cell: Cell, beam: Vec<H>) {
        if beam.is_empty() {
            return;
        }
        self.cells.insert(cell, beam);
        self.last_populated = Some(cell);
    }

    /// Beam stored at `cell`.
    pub fn get(&self, cell: Cell) -> Option<&[H]> {
        self.cells.get(&cell).map(Vec::as_slice)
    }

    /// Most recently populated cell.
    pub fn last_populated(&self) -> Option<Cell> {
        self.last_populated
    }

    /// All populated cells, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.keys().copied()
    }

    /// Populated cells at `step`, ascending by `emitted`.
    pub fn row(&self, step: usize) -> Vec<Cell> {
        let mut row: Vec<Cell> = self.cells().filter(|c| c.step == step).collect();
        row.sort_unstable();
        row
    }

    /// Drop cells older than `step`, keeping the last populated cell.
    pub fn retire_before(&mut self, step: usize) {
        let keep = self.last_populated;
        self.cells.retain(|cell, _| cell.step >= step || Some(*cell) == keep);
    }

    /// Remove and return the beam of the last populated cell.
    pub fn take_last_populated(&mut self) -> Vec<H> {
        self.last_populated
            .and_then(|cell| self.cells.remove(&cell))
            .unwrap_or_default()
    }
}

/// Range of `emitted` values reachable at `step`.
///
/// A hypothesis cannot have emitted more constraint tokens than steps taken,
/// nor fall so far behind that the rest cannot fit in the remaining steps.
/// When `max_steps < grid_height` the lower bound tracks `step`, so the
/// search emits constraint tokens on every step it has.
pub fn reachable(step: usize, max_steps: usize, grid_height: usize) -> RangeInclusive<usize> {
    let lo = step.saturating_sub(max_steps.saturating_sub(grid_height));
    let hi = step.min(grid_height);
    lo..=hi
}

/// Step-by-step grid beam search.
///
/// [`grid_search`] drives this to completion. Driving it by hand allows the
/// frontier to be inspected between steps.
pub struct GridSearch<'a, O: DecoderOracle, V: ?Sized> {
    oracle: &'a mut O,
    vocab: &'a V,
    config: SearchConfig,
    encoder_states: O::EncoderStates,
    grid_height: usize,
    frontier: Frontier<OracleHypothesis<O>>,
    results: Vec<OracleHypothesis<O>>,
    stats: SearchStats,
}

impl<'a, O, V> GridSearch<'a, O, V>
where
    O: DecoderOracle,
    V: Vocabulary + ?Sized,
{
    /// Set up the frontier with the root hypothesis at `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub fn new(
        oracle: &'a mut O,
        vocab: &'a V,
        encoded: OracleEncoding<O>,
        constraints: Arc<ConstraintSet>,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let grid_height = constraints.grid_height();
        let root = Hypothesis::start(
            vocab.start_id(),
            encoded.state,
            encoded.coverage,
            ConstraintTracker::new(constraints),
        );
        let mut frontier = Frontier::new();
        frontier.insert(Cell::new(0, 0), vec![root]);

        Ok(Self {
            oracle,
            vocab,
            config,
            encoder_states: encoded.encoder_states,
            grid_height,
            frontier,
            results: Vec::new(),
            stats: SearchStats::default(),
        })
    }

    /// Total constraint tokens.
    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    /// Current frontier.
    pub fn frontier(&self) -> &Frontier<OracleHypothesis<O>> {
        &self.frontier
    }

    /// Final results collected so far, in acceptance order.
    pub fn results(&self) -> &[OracleHypothesis<O>] {
        &self.results
    }

    /// Counters so far.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Check if no further step will run.
    pub fn is_finished(&self) -> bool {
        self.stats.steps >= self.config.max_dec_steps
            || self.frontier.row(self.stats.steps).is_empty()
    }

    /// Run one decode step, filling every reachable cell of the next row.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder fails or returns a malformed batch.
    /// Unreachable constraint tokens only drop the affected branch.
    pub fn step(&mut self) -> Result<(), SearchError> {
        let prev = self.stats.steps;
        let step = prev + 1;
        let window = reachable(step, self.config.max_dec_steps, self.grid_height);
        let top_k = self.config.top_k();

        // one decoder call per predecessor cell, shared by all three passes
        let mut expanded: HashMap<usize, OracleStep<O>> = HashMap::new();
        for cell in self.frontier.row(prev) {
            let j = cell.emitted;
            if !window.contains(&j) && !window.contains(&(j + 1)) {
                continue;
            }
            let Some(hyps) = self.frontier.get(cell) else {
                continue;
            };
            let Some(batch) = StepBatch::from_hypotheses(hyps, self.config.beam_size, self.vocab)
            else {
                continue;
            };
            let output = batch.run(&mut *self.oracle, &self.encoder_states, top_k)?;
            self.stats.oracle_calls += 1;
            expanded.insert(j, output);
        }

        let stop_id = self.vocab.stop_id();
        let accept_stop = self.config.accepts_stop_after(prev);
        let mut filled = Vec::new();

        for j in window {
            let mut candidates = Vec::new();

            if let (Some(hyps), Some(output)) =
                (self.frontier.get(Cell::new(prev, j)), expanded.get(&j))
            {
                free_pass(hyps, output, top_k, &mut candidates);
            }
            if let Some(below) = j.checked_sub(1) {
                if let (Some(hyps), Some(output)) =
                    (self.frontier.get(Cell::new(prev, below)), expanded.get(&below))
                {
                    self.stats.dropped_branches += start_pass(hyps, output, &mut candidates);
                    self.stats.dropped_branches += continue_pass(hyps, output, &mut candidates);
                }
            }
            if candidates.is_empty() {
                continue;
            }
            let num_candidates = candidates.len();

            let mut beam = Vec::with_capacity(self.config.beam_size);
            for h in sort_hypotheses(candidates) {
                if h.latest_token() == stop_id {
                    if accept_stop && h.is_constraint_satisfied() {
                        self.results.push(h);
                    }
                } else {
                    beam.push(h);
                }
                if beam.len() == self.config.beam_size {
                    break;
                }
            }

            trace!(
                step,
                emitted = j,
                candidates = num_candidates,
                beam = beam.len(),
                results = self.results.len(),
                "grid cell"
            );
            filled.push((Cell::new(step, j), beam));
        }

        for (cell, beam) in filled {
            self.frontier.insert(cell, beam);
        }
        self.frontier.retire_before(step);
        self.stats.steps = step;
        Ok(())
    }

    /// Pick the returned hypothesis.
    ///
    /// Completed results are preferred; without any, the beam of the last
    /// populated cell is ranked instead.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Exhausted`] if there is nothing to return.
    pub fn finish(mut self) -> Result<OracleOutput<O>, SearchError> {
        self.stats.completed = self.results.len();
        let (origin, pool) = if self.results.is_empty() {
            let cell = self.frontier.last_populated();
            let pool = self.frontier.take_last_populated();
            if let Some(best) = pool.first() {
                warn!(
                    ?cell,
                    pending = best.tracker().pending().len(),
                    "no hypothesis completed; returning best of last beam"
                );
            }
            (Origin::Fallback, pool)
        } else {
            (Origin::Completed, std::mem::take(&mut self.results))
        };

        let hypothesis = select_ranked(sort_hypotheses(pool), self.config.result_rank)
            .ok_or(SearchError::Exhausted)?;

        debug!(
            ?origin,
            steps = self.stats.steps,
            oracle_calls = self.stats.oracle_calls,
            completed = self.stats.completed,
            dropped = self.stats.dropped_branches,
            len = hypothesis.len(),
            "grid search finished"
        );

        Ok(SearchOutput {
            hypothesis,
            origin,
            stats: self.stats,
        })
    }
}

/// Run grid beam search from an encoded source.
///
/// # Errors
///
/// Returns an error if the config is invalid or the decoder fails.
#[instrument(skip_all, fields(beam_size = config.beam_size, grid_height = constraints.grid_height()))]
pub fn grid_search<O, V>(
    oracle: &mut O,
    vocab: &V,
    encoded: OracleEncoding<O>,
    constraints: Arc<ConstraintSet>,
    config: &SearchConfig,
) -> Result<OracleOutput<O>, SearchError>
where
    O: DecoderOracle,
    V: Vocabulary + ?Sized,
{
    let mut search = GridSearch::new(oracle, vocab, encoded, constraints, *config)?;
    while !search.is_finished() {
        search.step()?;
    }
    search.finish()
}

/// Extend hypotheses with no phrase in flight by their top candidates.
fn free_pass<S, A, C>(
    hyps: &[Hypothesis<S, A, C>],
    output: &StepOutput<S, A, C>,
    top_k: usize,
    out: &mut Vec<Hypothesis<S, A, C>>,
) where
    S: Clone,
    A: Clone,
    C: Clone,
{
    for (row, h) in hyps.iter().enumerate().take(output.rows()) {
        if h.tracker().is_mid_phrase() {
            continue;
        }
        for col in 0..output.candidates(row).min(top_k) {
            out.push(h.extend(output.extension(row, col), h.tracker().clone()));
        }
    }
}

/// Force the first token of every pending phrase. Returns the number of
/// branches dropped.
fn start_pass<S, A, C>(
    hyps: &[Hypothesis<S, A, C>],
    output: &StepOutput<S, A, C>,
    out: &mut Vec<Hypothesis<S, A, C>>,
) -> usize
where
    S: Clone,
    A: Clone,
    C: Clone,
{
    let mut dropped = 0;
    for (row, h) in hyps.iter().enumerate().take(output.rows()) {
        for &phrase in h.tracker().startable() {
            let forced = h
                .tracker()
                .start(phrase)
                .and_then(|(token, tracker)| force(h, output, row, phrase, token, tracker));
            match forced {
                Ok(next) => out.push(next),
                Err(err) => {
                    debug!(%err, "dropping constraint start");
                    dropped += 1;
                }
            }
        }
    }
    dropped
}

/// Force the next token of the phrase in flight. Returns the number of
/// branches dropped.
fn continue_pass<S, A, C>(
    hyps: &[Hypothesis<S, A, C>],
    output: &StepOutput<S, A, C>,
    out: &mut Vec<Hypothesis<S, A, C>>,
) -> usize
where
    S: Clone,
    A: Clone,
    C: Clone,
{
    let mut dropped = 0;
    for (row, h) in hyps.iter().enumerate().take(output.rows()) {
        let ConstraintPhase::MidPhrase { phrase, .. } = h.tracker().phase() else {
            continue;
        };
        let forced = h
            .tracker()
            .advance()
            .and_then(|(token, tracker)| force(h, output, row, phrase, token, tracker));
        match forced {
            Ok(next) => out.push(next),
            Err(err) => {
                debug!(%err, "dropping constraint continuation");
                dropped += 1;
            }
        }
    }
    dropped
}

/// Extend `h` with `token`, which must be among the decoder's candidates.
fn force<S, A, C>(
    h: &Hypothesis<S, A, C>,
    output: &StepOutput<S, A, C>,
    row: usize,
    phrase: usize,
    token: u32,
    tracker: ConstraintTracker,
) -> Result<Hypothesis<S, A, C>, ConstraintError>
where
    S: Clone,
    A: Clone,
    C: Clone,
{
    let col = output
        .position_of(row, token)
        .ok_or_else(|| ConstraintError::UnreachableToken {
            phrase,
            token,
            tokens: h.tokens().to_vec(),
        })?;
    Ok(h.extend(output.extension(row, col), tracker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigram::BigramOracle;
    use crate::vocab::Vocab;

    // ids: [UNK]=0 [PAD]=1 [START]=2 [STOP]=3 a=4 b=5 c=6 d=7 e=8
    fn vocab() -> Vocab {
        Vocab::new(["a", "b", "c", "d", "e"])
    }

    fn flat_oracle() -> BigramOracle {
        BigramOracle::new(vec![
            (3, -0.2),
            (4, -0.5),
            (7, -0.8),
            (8, -0.9),
            (5, -1.5),
            (6, -2.0),
        ])
    }

    fn constraints(phrases: Vec<Vec<u32>>) -> Arc<ConstraintSet> {
        Arc::new(ConstraintSet::new(phrases).unwrap())
    }

    #[test]
    fn test_reachable_window() {
        // 5 steps, 2 constraint tokens
        assert_eq!(reachable(1, 5, 2), 0..=1);
        assert_eq!(reachable(3, 5, 2), 0..=2);
        assert_eq!(reachable(4, 5, 2), 1..=2);
        assert_eq!(reachable(5, 5, 2), 2..=2);
        // unconstrained
        assert_eq!(reachable(7, 10, 0), 0..=0);
        // fewer steps than constraint tokens
        assert_eq!(reachable(2, 3, 5), 2..=2);
    }

    #[test]
    fn test_frontier_tracks_last_populated() {
        let mut frontier: Frontier<u8> = Frontier::new();
        frontier.insert(Cell::new(0, 0), vec![1]);
        frontier.insert(Cell::new(1, 0), vec![2]);
        frontier.insert(Cell::new(1, 1), Vec::new());
        assert_eq!(frontier.last_populated(), Some(Cell::new(1, 0)));
        assert!(frontier.get(Cell::new(1, 1)).is_none());

        frontier.insert(Cell::new(2, 1), Vec::new());
        frontier.retire_before(2);
        assert_eq!(frontier.get(Cell::new(0, 0)), None);
        assert_eq!(frontier.get(Cell::new(1, 0)), Some(&[2][..]));
        assert_eq!(frontier.take_last_populated(), vec![2]);
    }

    #[test]
    fn test_phrase_forced_in_two_steps() {
        let mut oracle = flat_oracle();
        let vocab = vocab();
        let encoded = oracle.encode().unwrap();
        let mut search = GridSearch::new(
            &mut oracle,
            &vocab,
            encoded,
            constraints(vec![vec![7, 8]]),
            SearchConfig::new(2, 6, 0),
        )
        .unwrap();

        search.step().unwrap();
        let started = search.frontier().get(Cell::new(1, 1)).unwrap();
        assert_eq!(started[0].tokens(), &[2, 7]);
        assert_eq!(
            started[0].tracker().phase(),
            ConstraintPhase::MidPhrase {
                phrase: 0,
                position: 0
            }
        );

        search.step().unwrap();
        let done = search.frontier().get(Cell::new(2, 2)).unwrap();
        assert_eq!(done[0].tokens(), &[2, 7, 8]);
        assert!(done[0].tracker().pending().is_empty());
        assert_eq!(done[0].tracker().phase(), ConstraintPhase::Free);
    }

    #[test]
    fn test_mid_phrase_only_continues() {
        let mut oracle = flat_oracle();
        let vocab = vocab();
        let encoded = oracle.encode().unwrap();
        let mut search = GridSearch::new(
            &mut oracle,
            &vocab,
            encoded,
            constraints(vec![vec![7, 8, 6]]),
            SearchConfig::new(3, 8, 0),
        )
        .unwrap();

        for _ in 0..3 {
            search.step().unwrap();
            for cell in search.frontier().row(search.stats().steps) {
                for h in search.frontier().get(cell).unwrap() {
                    assert_eq!(h.tracker().emitted(), cell.emitted);
                    if let ConstraintPhase::MidPhrase { phrase, position } = h.tracker().phase() {
                        let words = h.tracker().constraints().phrase(phrase).unwrap();
                        assert_eq!(h.latest_token(), words[position]);
                    }
                }
            }
        }
        let done = search.frontier().get(Cell::new(3, 3)).unwrap();
        assert_eq!(done[0].tokens(), &[2, 7, 8, 6]);
        assert_eq!(search.stats().dropped_branches, 0);
    }

    #[test]
    fn test_unreachable_token_drops_branch() {
        // top_k = 4 never offers token 6
        let mut oracle = flat_oracle();
        let vocab = vocab();
        let encoded = oracle.encode().unwrap();
        let mut search = GridSearch::new(
            &mut oracle,
            &vocab,
            encoded,
            constraints(vec![vec![7, 6]]),
            SearchConfig::new(2, 6, 0),
        )
        .unwrap();

        search.step().unwrap();
        search.step().unwrap();
        assert!(search.stats().dropped_branches > 0);
        assert!(search.frontier().get(Cell::new(2, 2)).is_none());
        assert!(search.frontier().get(Cell::new(2, 0)).is_some());
    }

    #[test]
    fn test_stop_requires_satisfied_constraints() {
        let mut oracle = flat_oracle();
        let vocab = vocab();
        let encoded = oracle.encode().unwrap();
        let out = grid_search(
            &mut oracle,
            &vocab,
            encoded,
            constraints(vec![vec![8]]),
            &SearchConfig::new(2, 6, 0),
        )
        .unwrap();

        assert!(out.is_completed());
        assert!(out.hypothesis.tokens().contains(&8));
        assert_eq!(out.hypothesis.latest_token(), 3);
    }

    #[test]
    fn test_unconstrained_grid_matches_beam_choice() {
        let mut oracle = BigramOracle::new(vec![(3, -5.0), (6, -6.0)])
            .with_row(2, vec![(4, -0.1), (5, -2.0)])
            .with_row(4, vec![(5, -0.1), (6, -3.0)])
            .with_row(5, vec![(3, -0.1), (4, -4.0)]);
        let vocab = vocab();
        let encoded = oracle.encode().unwrap();
        let out = grid_search(
            &mut oracle,
            &vocab,
            encoded,
            Arc::new(ConstraintSet::none()),
            &SearchConfig::new(2, 4, 0),
        )
        .unwrap();
        assert_eq!(out.hypothesis.tokens(), &[2, 4, 5, 3]);
    }

    #[test]
    fn test_one_oracle_call_per_predecessor_cell() {
        let mut oracle = flat_oracle();
        let vocab = vocab();
        let encoded = oracle.encode().unwrap();
        let out = grid_search(
            &mut oracle,
            &vocab,
            encoded,
            constraints(vec![vec![7]]),
            &SearchConfig::new(2, 2, 0),
        )
        .unwrap();

        // step 1 expands (0,0); step 2 expands (1,0) and (1,1)
        assert_eq!(out.stats.oracle_calls, 3);
        assert_eq!(oracle.calls(), 3);
    }

    #[test]
    fn test_oracle_failure_leaves_frontier_intact() {
        let mut oracle = flat_oracle().fail_after(1);
        let vocab = vocab();
        let encoded = oracle.encode().unwrap();
        let mut search = GridSearch::new(
            &mut oracle,
            &vocab,
            encoded,
            constraints(vec![vec![7]]),
            SearchConfig::new(2, 6, 0),
        )
        .unwrap();

        search.step().unwrap();
        let row = search.frontier().row(1);
        assert_eq!(row, vec![Cell::new(1, 0), Cell::new(1, 1)]);

        let err = search.step().unwrap_err();
        assert!(matches!(err, SearchError::Oracle(_)));
        assert_eq!(search.stats().steps, 1);
        assert_eq!(search.frontier().row(1), row);
        assert!(search.frontier().row(2).is_empty());
        assert_eq!(search.frontier().last_populated(), Some(Cell::new(1, 1)));
    }
}
