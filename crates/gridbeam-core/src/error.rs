//! Error types for constraint tracking and search configuration.

use thiserror::Error;

/// Errors raised while building or advancing lexical constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    /// A constraint phrase contains no tokens.
    #[error("constraint phrase {0} is empty")]
    EmptyPhrase(usize),

    /// The requested transition is not legal in the tracker's current phase.
    #[error("constraint transition not valid in current phase")]
    InvalidTransition,

    /// A forced constraint token was not among the decoder's candidates.
    ///
    /// Carries the token sequence of the hypothesis whose branch is lost.
    #[error("constraint token {token} of phrase {phrase} is not among the decoder candidates")]
    UnreachableToken {
        phrase: usize,
        token: u32,
        tokens: Vec<u32>,
    },
}

/// Errors in a [`SearchConfig`](crate::SearchConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Beam width must be at least one.
    #[error("beam size must be at least 1")]
    ZeroBeamSize,

    /// The step ceiling must be at least one.
    #[error("max decode steps must be at least 1")]
    ZeroMaxSteps,

    /// The minimum step count can never be reached.
    #[error("min decode steps ({min}) exceeds max decode steps ({max})")]
    MinExceedsMax { min: usize, max: usize },
}
