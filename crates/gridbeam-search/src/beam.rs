//! Plain beam search.

use gridbeam_core::{select_ranked, sort_hypotheses, ConstraintTracker, Hypothesis, SearchConfig};
use tracing::{debug, instrument, trace};

use crate::batch::StepBatch;
use crate::error::SearchError;
use crate::oracle::{DecoderOracle, OracleEncoding, OracleHypothesis};
use crate::output::{OracleOutput, Origin, SearchOutput, SearchStats};
use crate::vocab::Vocabulary;

/// Run unconstrained beam search from an encoded source.
///
/// Keeps up to `beam_size` live hypotheses. Each step extends every live
/// hypothesis with its top `2 * beam_size` candidates, ranks all of them
/// and routes stop-terminated ones to the results. The search ends after
/// `max_dec_steps` steps or once `beam_size` results exist. With no results
/// the live beam is ranked instead, so the output is never empty.
///
/// # Errors
///
/// Returns an error if the config is invalid or the decoder fails.
#[instrument(skip_all, fields(beam_size = config.beam_size))]
pub fn beam_search<O, V>(
    oracle: &mut O,
    vocab: &V,
    encoded: OracleEncoding<O>,
    config: &SearchConfig,
) -> Result<OracleOutput<O>, SearchError>
where
    O: DecoderOracle,
    V: Vocabulary + ?Sized,
{
    config.validate()?;

    let root: OracleHypothesis<O> = Hypothesis::start(
        vocab.start_id(),
        encoded.state,
        encoded.coverage,
        ConstraintTracker::unconstrained(),
    );
    let encoder_states = encoded.encoder_states;
    let stop_id = vocab.stop_id();
    let top_k = config.top_k();

    // beam_size copies of the root; only the first is expanded on step 0
    let mut hyps = vec![root; config.beam_size];
    let mut results: Vec<OracleHypothesis<O>> = Vec::new();
    let mut stats = SearchStats::default();

    while stats.steps < config.max_dec_steps && results.len() < config.beam_size {
        let Some(batch) = StepBatch::from_hypotheses(&hyps, config.beam_size, vocab) else {
            break;
        };
        let output = batch.run(oracle, &encoder_states, top_k)?;
        stats.oracle_calls += 1;

        let num_orig = if stats.steps == 0 { 1 } else { hyps.len() };
        let mut candidates = Vec::with_capacity(num_orig * top_k);
        for (row, h) in hyps.iter().enumerate().take(num_orig) {
            for col in 0..output.candidates(row).min(top_k) {
                candidates.push(h.extend(output.extension(row, col), h.tracker().clone()));
            }
        }
        let num_candidates = candidates.len();

        let mut next = Vec::with_capacity(config.beam_size);
        for h in sort_hypotheses(candidates) {
            if h.latest_token() == stop_id {
                if config.accepts_stop_after(stats.steps) {
                    results.push(h);
                }
            } else {
                next.push(h);
            }
            if next.len() == config.beam_size || results.len() == config.beam_size {
                break;
            }
        }

        trace!(
            step = stats.steps,
            candidates = num_candidates,
            live = next.len(),
            results = results.len(),
            "beam step"
        );

        stats.steps += 1;
        if next.is_empty() {
            // every candidate stopped; keep the previous beam as the fallback
            break;
        }
        hyps = next;
    }

    stats.completed = results.len();
    let (origin, pool) = if results.is_empty() {
        (Origin::Fallback, hyps)
    } else {
        (Origin::Completed, results)
    };
    let hypothesis =
        select_ranked(sort_hypotheses(pool), config.result_rank).ok_or(SearchError::Exhausted)?;

    debug!(
        ?origin,
        steps = stats.steps,
        oracle_calls = stats.oracle_calls,
        completed = stats.completed,
        len = hypothesis.len(),
        "beam search finished"
    );

    Ok(SearchOutput {
        hypothesis,
        origin,
        stats,
    })
}
