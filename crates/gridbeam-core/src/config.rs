//! Search configuration.

use crate::error::ConfigError;

/// Beam search settings shared by plain and grid search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct SearchConfig {
    /// Beam width. The decoder is asked for `2 * beam_size` candidates per row.
    pub beam_size: usize,
    /// Hard ceiling on decode steps.
    pub max_dec_steps: usize,
    /// Minimum number of generated tokens before a stop token is accepted.
    pub min_dec_steps: usize,
    /// Which entry of the ranked result list to return (0 = best).
    pub result_rank: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            beam_size: 4,
            max_dec_steps: 100,
            min_dec_steps: 35,
            result_rank: 0,
        }
    }
}

impl SearchConfig {
    /// Create a config returning the top-ranked result.
    pub fn new(beam_size: usize, max_dec_steps: usize, min_dec_steps: usize) -> Self {
        Self {
            beam_size,
            max_dec_steps,
            min_dec_steps,
            result_rank: 0,
        }
    }

    /// Single-beam search with no minimum length.
    pub fn greedy(max_dec_steps: usize) -> Self {
        Self::new(1, max_dec_steps, 0)
    }

    /// Return a copy that selects the result at `rank` instead of the best one.
    pub fn with_result_rank(mut self, rank: usize) -> Self {
        self.result_rank = rank;
        self
    }

    /// Number of candidates requested from the decoder per hypothesis.
    #[inline]
    pub fn top_k(&self) -> usize {
        self.beam_size * 2
    }

    /// Check that the settings describe a runnable search.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `beam_size` or `max_dec_steps` is zero
    /// - `min_dec_steps` exceeds `max_dec_steps`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.beam_size == 0 {
            return Err(ConfigError::ZeroBeamSize);
        }
        if self.max_dec_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        if self.min_dec_steps > self.max_dec_steps {
            return Err(ConfigError::MinExceedsMax {
                min: self.min_dec_steps,
                max: self.max_dec_steps,
            });
        }
        Ok(())
    }

    /// Whether a stop token produced after `generated` tokens may end a hypothesis.
    #[inline]
    pub fn accepts_stop_after(&self, generated: usize) -> bool {
        generated >= self.min_dec_steps
    }
}
