//! Serializable summary of a finished search.

use gridbeam_search::{SearchOutput, Vocabulary};
use serde::{Deserialize, Serialize};

use crate::SerdeError;

/// What a search produced, without the decoder's opaque state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeReport {
    /// Token ids, starting with the start token.
    pub tokens: Vec<u32>,
    /// Per-token log probabilities.
    pub log_probs: Vec<f32>,
    /// Generation probability per generated token.
    pub p_gens: Vec<f32>,
    /// Length-normalised log probability.
    pub avg_log_prob: f32,
    /// Whether the hypothesis ended with the stop token.
    pub completed: bool,
    /// Decoded words, if a vocabulary was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<String>>,
}

impl DecodeReport {
    /// Summarise `output`.
    pub fn new<S, A, C>(output: &SearchOutput<S, A, C>) -> Self {
        let h = &output.hypothesis;
        Self {
            tokens: h.tokens().to_vec(),
            log_probs: h.log_probs().to_vec(),
            p_gens: h.p_gens().to_vec(),
            avg_log_prob: h.avg_log_prob(),
            completed: output.is_completed(),
            words: None,
        }
    }

    /// Summarise `output` and decode its generated tokens with `vocab`.
    ///
    /// Ids outside the vocabulary are rendered as the unknown token.
    pub fn with_vocab<S, A, C, V>(output: &SearchOutput<S, A, C>, vocab: &V) -> Self
    where
        V: Vocabulary + ?Sized,
    {
        let unknown = vocab
            .word_of(vocab.unknown_id())
            .unwrap_or(gridbeam_search::vocab::UNKNOWN_TOKEN);
        let words = output
            .generated()
            .iter()
            .map(|&id| vocab.word_of(id).unwrap_or(unknown).to_string())
            .collect();
        Self {
            words: Some(words),
            ..Self::new(output)
        }
    }

    /// Render as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SerdeError::Json`] if a float is not finite.
    pub fn to_json(&self) -> Result<String, SerdeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SerdeError::Json`] if a float is not finite.
    pub fn to_json_pretty(&self) -> Result<String, SerdeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report back.
    ///
    /// # Errors
    ///
    /// Returns [`SerdeError::Json`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, SerdeError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbeam_search::{BeamDecoder, BigramOracle, SearchConfig, Vocab};

    fn decoder() -> BeamDecoder<BigramOracle, Vocab> {
        // [START]=2 [STOP]=3 hi=4 there=5
        let oracle = BigramOracle::new(vec![(3, -0.5), (4, -1.0)])
            .with_row(2, vec![(4, -0.25), (5, -2.0)])
            .with_row(4, vec![(5, -0.25), (3, -2.0)]);
        BeamDecoder::new(oracle, Vocab::new(["hi", "there"]), SearchConfig::greedy(5)).unwrap()
    }

    #[test]
    fn test_report_fields() {
        let mut decoder = decoder();
        let out = decoder.decode().unwrap();
        let report = DecodeReport::with_vocab(&out, decoder.vocab());

        assert_eq!(report.tokens, vec![2, 4, 5, 3]);
        assert_eq!(report.log_probs, vec![0.0, -0.25, -0.25, -0.5]);
        assert_eq!(report.p_gens, vec![1.0, 1.0, 1.0]);
        assert_eq!(report.avg_log_prob, -0.25);
        assert!(report.completed);
        assert_eq!(
            report.words,
            Some(vec!["hi".to_string(), "there".to_string(), "[STOP]".to_string()])
        );
    }

    #[test]
    fn test_words_omitted_without_vocab() {
        let mut decoder = decoder();
        let out = decoder.decode().unwrap();
        let json = DecodeReport::new(&out).to_json().unwrap();

        assert!(!json.contains("words"));
        assert!(json.contains(r#""completed":true"#));
    }

    #[test]
    fn test_json_round_trip() {
        let mut decoder = decoder();
        let out = decoder.decode_phrases(&["there"]).unwrap();
        let report = DecodeReport::with_vocab(&out, decoder.vocab());

        let pretty = report.to_json_pretty().unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(DecodeReport::from_json(&pretty).unwrap(), report);
    }
}
