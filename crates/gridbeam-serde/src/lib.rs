//! JSON formats for gridbeam.
//!
//! Loads [`SearchConfig`] and constraint phrases from JSON, and renders a
//! finished search as a [`DecodeReport`].

mod report;

use gridbeam_core::{ConfigError, ConstraintError, ConstraintSet, SearchConfig};
use thiserror::Error;

pub use report::DecodeReport;

/// Errors reading or writing gridbeam JSON.
#[derive(Debug, Error)]
pub enum SerdeError {
    /// The input is not valid JSON for the expected shape.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The config parsed but does not validate.
    #[error("invalid search config: {0}")]
    Config(#[from] ConfigError),

    /// The phrases parsed but do not form a constraint set.
    #[error("invalid constraints: {0}")]
    Constraint(#[from] ConstraintError),
}

/// Parse and validate a search config.
///
/// Missing fields take their [`SearchConfig::default`] values.
///
/// # Errors
///
/// Returns [`SerdeError::Json`] for malformed input and
/// [`SerdeError::Config`] if the parsed config does not validate.
///
/// # Example
///
/// ```
/// let config = gridbeam_serde::config_from_json(r#"{"beam_size": 8}"#).unwrap();
/// assert_eq!(config.beam_size, 8);
/// assert_eq!(config.max_dec_steps, 100);
/// ```
pub fn config_from_json(json: &str) -> Result<SearchConfig, SerdeError> {
    let config: SearchConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Render a config as JSON.
///
/// # Errors
///
/// Returns [`SerdeError::Json`] if serialization fails.
pub fn config_to_json(config: &SearchConfig) -> Result<String, SerdeError> {
    Ok(serde_json::to_string(config)?)
}

/// Parse constraint phrases given as nested arrays of token ids,
/// e.g. `[[7, 8], [3]]`.
///
/// # Errors
///
/// Returns [`SerdeError::Json`] for malformed input and
/// [`SerdeError::Constraint`] for an empty phrase.
pub fn constraints_from_json(json: &str) -> Result<ConstraintSet, SerdeError> {
    let phrases: Vec<Vec<u32>> = serde_json::from_str(json)?;
    Ok(ConstraintSet::new(phrases)?)
}
