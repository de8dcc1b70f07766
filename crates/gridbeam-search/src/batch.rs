//! Fixed-width decoder batches built from a beam.
//!
//! The decoder always sees `beam_size` rows. A beam with fewer live
//! hypotheses is padded by repeating its last entry, and the padded rows are
//! cut from the output before the search looks at it.

use gridbeam_core::Hypothesis;

use crate::error::SearchError;
use crate::oracle::{DecoderOracle, OracleStep};
use crate::vocab::Vocabulary;

/// Decoder inputs for one step.
#[derive(Debug, Clone)]
pub struct StepBatch<S, C> {
    latest_tokens: Vec<u32>,
    states: Vec<S>,
    coverage: Vec<C>,
    real_rows: usize,
}

impl<S: Clone, C: Clone> StepBatch<S, C> {
    /// Collect the decoder inputs of `hyps`, padded to `width` rows.
    ///
    /// Out-of-vocabulary latest tokens are replaced by the unknown id.
    /// Returns `None` for an empty beam.
    pub fn from_hypotheses<A, V>(hyps: &[Hypothesis<S, A, C>], width: usize, vocab: &V) -> Option<Self>
    where
        V: Vocabulary + ?Sized,
    {
        let real = &hyps[..hyps.len().min(width)];
        let last = real.last()?;

        let mut latest_tokens = Vec::with_capacity(width);
        let mut states = Vec::with_capacity(width);
        let mut coverage = Vec::with_capacity(width);
        for h in real {
            latest_tokens.push(vocab.embeddable(h.latest_token()));
            states.push(h.state().clone());
            coverage.push(h.coverage().clone());
        }
        while latest_tokens.len() < width {
            latest_tokens.push(vocab.embeddable(last.latest_token()));
            states.push(last.state().clone());
            coverage.push(last.coverage().clone());
        }

        Some(Self {
            latest_tokens,
            states,
            coverage,
            real_rows: real.len(),
        })
    }
}

impl<S, C> StepBatch<S, C> {
    /// Latest token per row, padding included.
    pub fn latest_tokens(&self) -> &[u32] {
        &self.latest_tokens
    }

    /// Decoder state per row, padding included.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Coverage per row, padding included.
    pub fn coverage(&self) -> &[C] {
        &self.coverage
    }

    /// Rows that belong to real hypotheses.
    pub fn real_rows(&self) -> usize {
        self.real_rows
    }

    /// Total rows sent to the decoder.
    pub fn width(&self) -> usize {
        self.latest_tokens.len()
    }

    /// Run the decoder on this batch and drop the padded rows.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Oracle`] if the decoder fails, and
    /// [`SearchError::MalformedStep`] or [`SearchError::RaggedRow`] if its
    /// output does not cover every real row.
    pub fn run<O>(
        &self,
        oracle: &mut O,
        encoder_states: &O::EncoderStates,
        top_k: usize,
    ) -> Result<OracleStep<O>, SearchError>
    where
        O: DecoderOracle<State = S, Coverage = C>,
    {
        let mut output = oracle
            .decode_step(
                encoder_states,
                &self.latest_tokens,
                &self.states,
                &self.coverage,
                top_k,
            )
            .map_err(SearchError::oracle)?;

        let got = output.rows();
        if got < self.real_rows {
            return Err(SearchError::MalformedStep {
                expected: self.real_rows,
                got,
            });
        }
        output.truncate(self.real_rows);

        for (row, (ids, log_probs)) in output
            .top_ids
            .iter()
            .zip(&output.top_log_probs)
            .enumerate()
        {
            if ids.len() != log_probs.len() {
                return Err(SearchError::RaggedRow {
                    row,
                    ids: ids.len(),
                    log_probs: log_probs.len(),
                });
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigram::BigramOracle;
    use crate::vocab::Vocab;
    use gridbeam_core::{ConstraintTracker, Extension};

    fn hyp(tokens: &[u32]) -> Hypothesis<usize, u32, usize> {
        let mut h = Hypothesis::start(2, 0, 0, ConstraintTracker::unconstrained());
        for (i, &token) in tokens.iter().enumerate() {
            let step = Extension {
                token,
                log_prob: -1.0,
                state: i + 1,
                attn_dist: 0,
                p_gen: 1.0,
                coverage: i + 1,
            };
            h = h.extend(step, h.tracker().clone());
        }
        h
    }

    #[test]
    fn test_padding_repeats_last() {
        let vocab = Vocab::new(["a", "b", "c"]);
        let hyps = vec![hyp(&[4]), hyp(&[5, 6])];
        let batch = StepBatch::from_hypotheses(&hyps, 4, &vocab).unwrap();

        assert_eq!(batch.width(), 4);
        assert_eq!(batch.real_rows(), 2);
        assert_eq!(batch.latest_tokens(), &[4, 6, 6, 6]);
        assert_eq!(batch.states(), &[1, 2, 2, 2]);
        assert_eq!(batch.coverage(), &[1, 2, 2, 2]);
    }

    #[test]
    fn test_oov_replaced() {
        let vocab = Vocab::new(["a"]);
        let hyps = vec![hyp(&[4]), hyp(&[77])];
        let batch = StepBatch::from_hypotheses(&hyps, 3, &vocab).unwrap();
        assert_eq!(batch.latest_tokens(), &[4, 0, 0]);
    }

    #[test]
    fn test_empty_beam() {
        let vocab = Vocab::new(["a"]);
        let hyps: Vec<Hypothesis<usize, u32, usize>> = Vec::new();
        assert!(StepBatch::from_hypotheses(&hyps, 3, &vocab).is_none());
    }

    #[test]
    fn test_run_drops_padding() {
        let vocab = Vocab::new(["a", "b"]);
        let mut oracle = BigramOracle::new(vec![(4, -0.5), (5, -1.0)]);
        let hyps = vec![hyp(&[4])];
        let batch = StepBatch::from_hypotheses(&hyps, 3, &vocab).unwrap();

        let output = batch.run(&mut oracle, &(), 4).unwrap();
        assert_eq!(output.rows(), 1);
        assert_eq!(output.top_ids, vec![vec![4, 5]]);
        assert_eq!(oracle.history(), &[vec![4, 4, 4]]);
    }

    /// Damage applied to the bigram output.
    enum Fault {
        DropRows,
        ShortLogProbs,
    }

    struct FaultyOracle {
        inner: BigramOracle,
        fault: Fault,
    }

    impl DecoderOracle for FaultyOracle {
        type EncoderStates = ();
        type State = usize;
        type Attention = u32;
        type Coverage = usize;
        type Error = crate::bigram::BigramError;

        fn encode(&mut self) -> Result<crate::oracle::Encoded<(), usize, usize>, Self::Error> {
            self.inner.encode()
        }

        fn decode_step(
            &mut self,
            encoder_states: &(),
            latest_tokens: &[u32],
            states: &[usize],
            prev_coverage: &[usize],
            top_k: usize,
        ) -> Result<crate::oracle::StepOutput<usize, u32, usize>, Self::Error> {
            let mut output =
                self.inner
                    .decode_step(encoder_states, latest_tokens, states, prev_coverage, top_k)?;
            match self.fault {
                Fault::DropRows => output.truncate(1),
                Fault::ShortLogProbs => {
                    for row in &mut output.top_log_probs {
                        row.pop();
                    }
                }
            }
            Ok(output)
        }
    }

    fn faulty(fault: Fault) -> FaultyOracle {
        FaultyOracle {
            inner: BigramOracle::new(vec![(4, -0.5), (5, -1.0), (6, -1.5)]),
            fault,
        }
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let vocab = Vocab::new(["a", "b", "c"]);
        let hyps = vec![hyp(&[4]), hyp(&[5]), hyp(&[6])];
        let batch = StepBatch::from_hypotheses(&hyps, 3, &vocab).unwrap();

        let err = batch.run(&mut faulty(Fault::DropRows), &(), 4).unwrap_err();
        assert!(matches!(
            err,
            SearchError::MalformedStep {
                expected: 3,
                got: 1
            }
        ));
    }

    #[test]
    fn test_padding_rows_may_be_missing() {
        let vocab = Vocab::new(["a", "b", "c"]);
        let hyps = vec![hyp(&[4])];
        let batch = StepBatch::from_hypotheses(&hyps, 3, &vocab).unwrap();

        let output = batch.run(&mut faulty(Fault::DropRows), &(), 4).unwrap();
        assert_eq!(output.rows(), 1);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let vocab = Vocab::new(["a", "b", "c"]);
        let hyps = vec![hyp(&[4]), hyp(&[5])];
        let batch = StepBatch::from_hypotheses(&hyps, 2, &vocab).unwrap();

        let err = batch
            .run(&mut faulty(Fault::ShortLogProbs), &(), 4)
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::RaggedRow {
                row: 0,
                ids: 3,
                log_probs: 2
            }
        ));
        assert_eq!(
            err.to_string(),
            "decoder row 0 has 3 candidate ids but 2 log probs"
        );
    }
}
