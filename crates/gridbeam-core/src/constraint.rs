//! Lexical constraints and the per-hypothesis progress tracker.
//!
//! A [`ConstraintSet`] is fixed for one search and shared by every
//! hypothesis descended from the root. Each hypothesis carries a
//! [`ConstraintTracker`] recording which phrases are still unwritten and
//! which phrase, if any, is being emitted right now.

use std::sync::Arc;

use crate::error::ConstraintError;

/// Ordered list of phrases that must each appear fully and contiguously.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    phrases: Vec<Vec<u32>>,
    grid_height: usize,
}

impl ConstraintSet {
    /// Build a constraint set from token-id phrases.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::EmptyPhrase`] if any phrase has no tokens.
    pub fn new(phrases: Vec<Vec<u32>>) -> Result<Self, ConstraintError> {
        if let Some(idx) = phrases.iter().position(Vec::is_empty) {
            return Err(ConstraintError::EmptyPhrase(idx));
        }
        let grid_height = phrases.iter().map(Vec::len).sum();
        Ok(Self {
            phrases,
            grid_height,
        })
    }

    /// The empty constraint set.
    pub fn none() -> Self {
        Self::default()
    }

    /// All phrases in declaration order.
    pub fn phrases(&self) -> &[Vec<u32>] {
        &self.phrases
    }

    /// Get a phrase by index.
    pub fn phrase(&self, idx: usize) -> Option<&[u32]> {
        self.phrases.get(idx).map(Vec::as_slice)
    }

    /// Number of phrases.
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// Check if there are no phrases.
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Total token count across all phrases.
    ///
    /// This bounds the second axis of the search grid.
    pub fn grid_height(&self) -> usize {
        self.grid_height
    }
}

/// Constraint progress of a single hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintPhase {
    /// Every phrase has been written.
    Free,
    /// Phrases remain, none is in flight.
    AwaitingStart,
    /// `phrase` is being emitted; `position` is the index of its last emitted token.
    MidPhrase { phrase: usize, position: usize },
}

/// Immutable constraint cursor threaded through hypotheses.
///
/// Transitions return a new tracker. The pending list is shared between
/// siblings and only rebuilt when a phrase completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintTracker {
    constraints: Arc<ConstraintSet>,
    /// Indices of phrases not yet fully written, in iteration order.
    pending: Arc<[usize]>,
    phase: ConstraintPhase,
    /// Forced tokens emitted so far.
    emitted: usize,
}

impl ConstraintTracker {
    /// Create a tracker with every phrase pending.
    pub fn new(constraints: Arc<ConstraintSet>) -> Self {
        let pending: Arc<[usize]> = (0..constraints.len()).collect();
        let phase = if pending.is_empty() {
            ConstraintPhase::Free
        } else {
            ConstraintPhase::AwaitingStart
        };
        Self {
            constraints,
            pending,
            phase,
            emitted: 0,
        }
    }

    /// Tracker for an unconstrained search.
    pub fn unconstrained() -> Self {
        Self::new(Arc::new(ConstraintSet::none()))
    }

    /// The shared constraint set.
    pub fn constraints(&self) -> &Arc<ConstraintSet> {
        &self.constraints
    }

    /// Phrase indices still to be written.
    pub fn pending(&self) -> &[usize] {
        &self.pending
    }

    /// Current phase.
    pub fn phase(&self) -> ConstraintPhase {
        self.phase
    }

    /// Number of forced tokens emitted, i.e. the grid row this tracker belongs to.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Check if every phrase has been written.
    pub fn is_satisfied(&self) -> bool {
        self.pending.is_empty()
    }

    /// Check if a phrase is in flight.
    pub fn is_mid_phrase(&self) -> bool {
        matches!(self.phase, ConstraintPhase::MidPhrase { .. })
    }

    /// Phrases that may be started from the current phase.
    ///
    /// Empty unless the tracker is [`ConstraintPhase::AwaitingStart`].
    pub fn startable(&self) -> &[usize] {
        match self.phase {
            ConstraintPhase::AwaitingStart => &self.pending,
            _ => &[],
        }
    }

    /// Begin emitting `phrase`.
    ///
    /// Returns the forced first token and the tracker after emitting it.
    /// A single-token phrase is completed immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::InvalidTransition`] if a phrase is already
    /// in flight or `phrase` is not pending.
    pub fn start(&self, phrase: usize) -> Result<(u32, Self), ConstraintError> {
        if self.phase != ConstraintPhase::AwaitingStart || !self.pending.contains(&phrase) {
            return Err(ConstraintError::InvalidTransition);
        }
        let words = self
            .constraints
            .phrase(phrase)
            .ok_or(ConstraintError::InvalidTransition)?;
        let token = *words.first().ok_or(ConstraintError::EmptyPhrase(phrase))?;

        if words.len() == 1 {
            return Ok((token, self.complete(phrase)));
        }
        Ok((
            token,
            Self {
                constraints: Arc::clone(&self.constraints),
                pending: Arc::clone(&self.pending),
                phase: ConstraintPhase::MidPhrase {
                    phrase,
                    position: 0,
                },
                emitted: self.emitted + 1,
            },
        ))
    }

    /// Emit the next token of the phrase in flight.
    ///
    /// Returns the forced token and the tracker after emitting it. On the
    /// phrase's last token the phrase leaves the pending list.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::InvalidTransition`] if no phrase is in flight.
    pub fn advance(&self) -> Result<(u32, Self), ConstraintError> {
        let ConstraintPhase::MidPhrase { phrase, position } = self.phase else {
            return Err(ConstraintError::InvalidTransition);
        };
        let words = self
            .constraints
            .phrase(phrase)
            .ok_or(ConstraintError::InvalidTransition)?;
        let next = position + 1;
        let token = *words.get(next).ok_or(ConstraintError::InvalidTransition)?;

        if next + 1 == words.len() {
            return Ok((token, self.complete(phrase)));
        }
        Ok((
            token,
            Self {
                constraints: Arc::clone(&self.constraints),
                pending: Arc::clone(&self.pending),
                phase: ConstraintPhase::MidPhrase {
                    phrase,
                    position: next,
                },
                emitted: self.emitted + 1,
            },
        ))
    }

    /// Tracker after the final token of `phrase` has been emitted.
    fn complete(&self, phrase: usize) -> Self {
        let pending: Arc<[usize]> = self
            .pending
            .iter()
            .copied()
            .filter(|&p| p != phrase)
            .collect();
        let phase = if pending.is_empty() {
            ConstraintPhase::Free
        } else {
            ConstraintPhase::AwaitingStart
        };
        Self {
            constraints: Arc::clone(&self.constraints),
            pending,
            phase,
            emitted: self.emitted + 1,
        }
    }
}
