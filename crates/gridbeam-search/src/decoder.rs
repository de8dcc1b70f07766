//! High-level decoding orchestrator.

use std::sync::Arc;

use gridbeam_core::{ConstraintSet, SearchConfig};

use crate::beam::beam_search;
use crate::error::SearchError;
use crate::grid::grid_search;
use crate::oracle::DecoderOracle;
use crate::output::OracleOutput;
use crate::vocab::Vocabulary;

/// Runs searches against one decoder and vocabulary.
///
/// Every call encodes the source afresh, so one decoder can serve several
/// searches with different constraints.
///
/// # Example
///
/// ```
/// use gridbeam_search::{BeamDecoder, BigramOracle, SearchConfig, Vocab};
///
/// let vocab = Vocab::new(["the", "cat", "sat"]);
/// let oracle = BigramOracle::new(vec![(3, -0.3), (4, -0.5), (5, -0.7), (6, -0.9)]);
/// let mut decoder = BeamDecoder::new(oracle, vocab, SearchConfig::new(2, 6, 0)).unwrap();
///
/// let out = decoder.decode_phrases(&["cat sat"]).unwrap();
/// let words = decoder.vocab().decode(out.generated());
/// assert!(words.windows(2).any(|w| w == ["cat", "sat"]));
/// ```
#[derive(Debug)]
pub struct BeamDecoder<O, V> {
    oracle: O,
    vocab: V,
    config: SearchConfig,
}

impl<O, V> BeamDecoder<O, V>
where
    O: DecoderOracle,
    V: Vocabulary,
{
    /// Create a decoder.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` does not validate.
    pub fn new(oracle: O, vocab: V, config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self {
            oracle,
            vocab,
            config,
        })
    }

    /// Search settings.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The vocabulary.
    pub fn vocab(&self) -> &V {
        &self.vocab
    }

    /// The decoder.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Mutable access to the decoder, e.g. to swap in a new source.
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Give back the decoder and vocabulary.
    pub fn into_parts(self) -> (O, V) {
        (self.oracle, self.vocab)
    }

    /// Run unconstrained beam search.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any decode step fails.
    pub fn decode(&mut self) -> Result<OracleOutput<O>, SearchError> {
        let encoded = self.oracle.encode().map_err(SearchError::oracle)?;
        beam_search(&mut self.oracle, &self.vocab, encoded, &self.config)
    }

    /// Run grid beam search so every phrase in `constraints` appears.
    ///
    /// An empty set still runs the grid search, with a single row.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any decode step fails.
    pub fn decode_constrained(
        &mut self,
        constraints: ConstraintSet,
    ) -> Result<OracleOutput<O>, SearchError> {
        let encoded = self.oracle.encode().map_err(SearchError::oracle)?;
        grid_search(
            &mut self.oracle,
            &self.vocab,
            encoded,
            Arc::new(constraints),
            &self.config,
        )
    }

    /// Run grid beam search with whitespace-separated word phrases.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Constraint`] if a phrase is blank, otherwise as
    /// [`decode_constrained`](Self::decode_constrained).
    pub fn decode_phrases(&mut self, phrases: &[&str]) -> Result<OracleOutput<O>, SearchError> {
        let constraints = self.vocab.constraints_from_phrases(phrases)?;
        self.decode_constrained(constraints)
    }
}
