//! Post-hoc verification of decoded output against lexical constraints.
//!
//! The grid search guarantees that completed hypotheses contain every
//! phrase. These checks work on plain token sequences, so they also apply
//! to output from fallback paths, other decoders or stored results.

use gridbeam_core::ConstraintSet;
use thiserror::Error;

/// A constraint check failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// These phrases do not occur contiguously in the output.
    #[error("constraint phrases {missing:?} missing from output")]
    MissingPhrases { missing: Vec<usize> },
}

/// Check if `phrase` occurs as a contiguous run in `tokens`.
pub fn contains_phrase(tokens: &[u32], phrase: &[u32]) -> bool {
    if phrase.is_empty() {
        return true;
    }
    tokens.windows(phrase.len()).any(|w| w == phrase)
}

/// Indices of phrases that do not occur in `tokens`, ascending.
pub fn missing_phrases(tokens: &[u32], constraints: &ConstraintSet) -> Vec<usize> {
    constraints
        .phrases()
        .iter()
        .enumerate()
        .filter(|(_, phrase)| !contains_phrase(tokens, phrase))
        .map(|(idx, _)| idx)
        .collect()
}

/// Check that every phrase occurs in `tokens`.
///
/// # Errors
///
/// Returns [`VerifyError::MissingPhrases`] listing every absent phrase.
///
/// # Example
///
/// ```
/// use gridbeam_core::ConstraintSet;
/// use gridbeam_verify::verify_constraints;
///
/// let set = ConstraintSet::new(vec![vec![7, 8], vec![3]]).unwrap();
/// assert!(verify_constraints(&[2, 3, 7, 8], &set).is_ok());
/// assert!(verify_constraints(&[2, 7, 3, 8], &set).is_err());
/// ```
pub fn verify_constraints(tokens: &[u32], constraints: &ConstraintSet) -> Result<(), VerifyError> {
    let missing = missing_phrases(tokens, constraints);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(VerifyError::MissingPhrases { missing })
    }
}
