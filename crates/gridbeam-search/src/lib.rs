//! Plain and lexically constrained beam search.
//!
//! The search drives an opaque [`DecoderOracle`] one batched step at a time
//! and never looks inside its state, attention or coverage values.
//!
//! - [`beam_search`]: unconstrained beam search over decode steps
//! - [`grid_search`]: grid beam search, where every phrase of a
//!   [`ConstraintSet`] must appear in the output
//! - [`BeamDecoder`]: owns a decoder and vocabulary and runs either search
//! - [`BigramOracle`]: table-driven decoder for tests and benchmarks
//!
//! # Example
//!
//! ```
//! use gridbeam_search::{BigramOracle, DecoderOracle, SearchConfig, Vocab, Vocabulary};
//! use std::sync::Arc;
//!
//! let vocab = Vocab::new(["new", "york", "is", "big"]);
//! let mut oracle = BigramOracle::new(vec![(6, -0.4), (7, -0.6), (3, -0.8), (4, -1.0), (5, -1.1)])
//!     .with_row(4, vec![(5, -0.2), (6, -0.9), (3, -1.5)])
//!     .with_row(5, vec![(3, -0.1), (6, -1.0)]);
//!
//! let constraints = vocab.constraints_from_phrases(&["new york"]).unwrap();
//! let encoded = oracle.encode().unwrap();
//! let out = gridbeam_search::grid_search(
//!     &mut oracle,
//!     &vocab,
//!     encoded,
//!     Arc::new(constraints),
//!     &SearchConfig::new(3, 10, 0),
//! )
//! .unwrap();
//!
//! assert!(out.is_completed());
//! assert!(out.hypothesis.is_constraint_satisfied());
//! ```

pub mod batch;
pub mod beam;
pub mod bigram;
pub mod decoder;
pub mod error;
pub mod grid;
pub mod oracle;
pub mod output;
pub mod vocab;

pub use gridbeam_core;
pub use gridbeam_core::{ConstraintSet, Hypothesis, SearchConfig};

pub use batch::StepBatch;
pub use beam::beam_search;
pub use bigram::{BigramError, BigramOracle};
pub use decoder::BeamDecoder;
pub use error::{SearchError, VocabError};
pub use grid::{grid_search, Cell, Frontier, GridSearch};
pub use oracle::{DecoderOracle, Encoded, OracleEncoding, OracleHypothesis, OracleStep, StepOutput};
pub use output::{Origin, OracleOutput, SearchOutput, SearchStats};
pub use vocab::{Vocab, Vocabulary};
