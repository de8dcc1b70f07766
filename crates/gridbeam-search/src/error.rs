//! Error types for running a search.

use gridbeam_core::{ConfigError, ConstraintError};
use thiserror::Error;

/// Errors that abort a search.
///
/// Constraint tokens the decoder cannot produce are not fatal: the affected
/// branch is dropped and counted in [`SearchStats`](crate::SearchStats).
#[derive(Debug, Error)]
pub enum SearchError {
    /// The search configuration is unusable.
    #[error("invalid search config: {0}")]
    Config(#[from] ConfigError),

    /// The constraint set could not be built.
    #[error("invalid constraints: {0}")]
    Constraint(#[from] ConstraintError),

    /// The decoder failed. Propagated unchanged.
    #[error("decoder oracle failed: {0}")]
    Oracle(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The decoder returned fewer rows than hypotheses in the batch.
    #[error("decoder returned {got} rows for {expected} hypotheses")]
    MalformedStep { expected: usize, got: usize },

    /// A decoder row had mismatched candidate ids and log probabilities.
    #[error("decoder row {row} has {ids} candidate ids but {log_probs} log probs")]
    RaggedRow {
        row: usize,
        ids: usize,
        log_probs: usize,
    },

    /// No hypothesis survived to be returned.
    #[error("search produced no hypothesis")]
    Exhausted,
}

impl SearchError {
    /// Wrap a decoder failure.
    pub fn oracle<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SearchError::Oracle(Box::new(err))
    }
}

/// Errors building a [`Vocab`](crate::Vocab).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VocabError {
    /// One of the reserved markers is absent from the word list.
    #[error("reserved token {0} missing from vocabulary")]
    MissingReserved(&'static str),

    /// A word appears twice.
    #[error("duplicate vocabulary entry {0:?}")]
    Duplicate(String),
}
