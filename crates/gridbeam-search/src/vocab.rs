//! Vocabulary adapter between words and decoder token ids.

use std::collections::HashMap;

use gridbeam_core::{ConstraintError, ConstraintSet};

use crate::error::VocabError;

/// Unknown-word marker.
pub const UNKNOWN_TOKEN: &str = "[UNK]";
/// Padding marker.
pub const PAD_TOKEN: &str = "[PAD]";
/// Marks the start of every decoded sequence.
pub const START_DECODING: &str = "[START]";
/// Marks the end of a decoded sequence.
pub const STOP_DECODING: &str = "[STOP]";

/// Maps words to token ids and exposes the reserved ids the search needs.
pub trait Vocabulary {
    /// Id of `word`, or the unknown id if it is not in the vocabulary.
    fn id_of(&self, word: &str) -> u32;

    /// Word for `id`, if `id` is in range.
    fn word_of(&self, id: u32) -> Option<&str>;

    /// Number of ids the decoder can embed. Ids at or above this are
    /// temporary out-of-vocabulary ids.
    fn size(&self) -> usize;

    /// Id of [`START_DECODING`].
    fn start_id(&self) -> u32;

    /// Id of [`STOP_DECODING`].
    fn stop_id(&self) -> u32;

    /// Id of [`UNKNOWN_TOKEN`].
    fn unknown_id(&self) -> u32;

    /// Replace an out-of-vocabulary id with the unknown id.
    #[inline]
    fn embeddable(&self, id: u32) -> u32 {
        if (id as usize) < self.size() {
            id
        } else {
            self.unknown_id()
        }
    }

    /// Build a constraint set from whitespace-separated phrases.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::EmptyPhrase`] for a phrase with no words.
    fn constraints_from_phrases(&self, phrases: &[&str]) -> Result<ConstraintSet, ConstraintError> {
        let ids = phrases
            .iter()
            .map(|phrase| phrase.split_whitespace().map(|w| self.id_of(w)).collect())
            .collect();
        ConstraintSet::new(ids)
    }
}

/// In-memory vocabulary backed by a word list.
///
/// A word's id is its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocab {
    words: Vec<String>,
    ids: HashMap<String, u32>,
    start_id: u32,
    stop_id: u32,
    unknown_id: u32,
}

impl Vocab {
    /// Build a vocabulary with the reserved markers at ids 0..4.
    ///
    /// Layout:
    /// - 0: `[UNK]`
    /// - 1: `[PAD]`
    /// - 2: `[START]`
    /// - 3: `[STOP]`
    /// - 4..: `words` in order, duplicates and reserved markers skipped
    pub fn new<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        let mut list: Vec<String> = [UNKNOWN_TOKEN, PAD_TOKEN, START_DECODING, STOP_DECODING]
            .iter()
            .map(|w| (*w).to_string())
            .collect();
        let mut ids: HashMap<String, u32> = list
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i as u32))
            .collect();

        for word in words {
            let word = word.into();
            if ids.contains_key(&word) {
                continue;
            }
            ids.insert(word.clone(), list.len() as u32);
            list.push(word);
        }

        Self {
            words: list,
            ids,
            unknown_id: 0,
            start_id: 2,
            stop_id: 3,
        }
    }

    /// Build a vocabulary from an exact word list.
    ///
    /// The list must contain `[UNK]`, `[START]` and `[STOP]`; their
    /// positions become the reserved ids.
    ///
    /// # Errors
    ///
    /// Returns an error if a reserved marker is missing or a word repeats.
    pub fn from_words<I, W>(words: I) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        let mut list = Vec::new();
        let mut ids = HashMap::new();
        for word in words {
            let word = word.into();
            if ids.contains_key(&word) {
                return Err(VocabError::Duplicate(word));
            }
            ids.insert(word.clone(), list.len() as u32);
            list.push(word);
        }

        let reserved = |name: &'static str| {
            ids.get(name)
                .copied()
                .ok_or(VocabError::MissingReserved(name))
        };
        let unknown_id = reserved(UNKNOWN_TOKEN)?;
        let start_id = reserved(START_DECODING)?;
        let stop_id = reserved(STOP_DECODING)?;

        Ok(Self {
            words: list,
            ids,
            start_id,
            stop_id,
            unknown_id,
        })
    }

    /// Map ids back to words; out-of-range ids become `[UNK]`.
    pub fn decode(&self, ids: &[u32]) -> Vec<&str> {
        ids.iter()
            .map(|&id| self.word_of(id).unwrap_or(UNKNOWN_TOKEN))
            .collect()
    }
}

impl Vocabulary for Vocab {
    fn id_of(&self, word: &str) -> u32 {
        self.ids.get(word).copied().unwrap_or(self.unknown_id)
    }

    fn word_of(&self, id: u32) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    fn size(&self) -> usize {
        self.words.len()
    }

    fn start_id(&self) -> u32 {
        self.start_id
    }

    fn stop_id(&self) -> u32 {
        self.stop_id
    }

    fn unknown_id(&self) -> u32 {
        self.unknown_id
    }
}
