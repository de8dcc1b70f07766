//! gridbeam: beam search with lexical constraints.
//!
//! Core data types shared by the plain and grid beam searches. Nothing in
//! this crate talks to a model; decoder state, attention and coverage are
//! opaque type parameters that are only threaded through.
//!
//! # Overview
//!
//! - [`Hypothesis`]: an immutable partial output sequence
//! - [`ConstraintSet`]: phrases that must appear fully and contiguously
//! - [`ConstraintTracker`]: per-hypothesis progress through those phrases
//! - [`sort_hypotheses`]: stable ranking by length-normalised log probability
//! - [`SearchConfig`]: beam width and step limits
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gridbeam_core::{ConstraintPhase, ConstraintSet, ConstraintTracker, Extension, Hypothesis};
//!
//! let constraints = Arc::new(ConstraintSet::new(vec![vec![7, 8]]).unwrap());
//! let root: Hypothesis<(), (), ()> =
//!     Hypothesis::start(1, (), (), ConstraintTracker::new(constraints));
//!
//! // Force the first token of phrase 0
//! let (token, tracker) = root.tracker().start(0).unwrap();
//! let step = Extension { token, log_prob: -0.2, state: (), attn_dist: (), p_gen: 1.0, coverage: () };
//! let h = root.extend(step, tracker);
//! assert_eq!(h.tokens(), &[1, 7]);
//! assert_eq!(h.tracker().phase(), ConstraintPhase::MidPhrase { phrase: 0, position: 0 });
//!
//! // Finish the phrase
//! let (token, tracker) = h.tracker().advance().unwrap();
//! let step = Extension { token, log_prob: -0.4, state: (), attn_dist: (), p_gen: 1.0, coverage: () };
//! let h = h.extend(step, tracker);
//! assert!(h.is_constraint_satisfied());
//! assert!((h.avg_log_prob() + 0.2).abs() < 1e-6);
//! ```

pub mod config;
pub mod constraint;
pub mod error;
pub mod hypothesis;
pub mod rank;

pub use config::SearchConfig;
pub use constraint::{ConstraintPhase, ConstraintSet, ConstraintTracker};
pub use error::{ConfigError, ConstraintError};
pub use hypothesis::{Extension, Hypothesis};
pub use rank::{select_ranked, sort_hypotheses};
