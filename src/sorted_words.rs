use parking_lot::RwLock;
use std::collections::BTreeSet;

/// Distinct words seen by the pool, kept in sorted order.
///
/// Inserts check under the read lock first so repeated words never take the
/// write lock.
#[derive(Default)]
pub struct SortedWordSet {
    words: RwLock<BTreeSet<String>>,
}

impl SortedWordSet {
    pub fn new() -> Self {
        SortedWordSet {
            words: RwLock::new(BTreeSet::new()),
        }
    }

    /// Returns true when `word` was not already present.
    pub fn insert(&self, word: &str) -> bool {
        if self.words.read().contains(word) {
            return false;
        }
        self.words.write().insert(word.to_owned())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.read().contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.read().is_empty()
    }

    /// All words in ascending order.
    pub fn to_vec(&self) -> Vec<String> {
        self.words.read().iter().cloned().collect()
    }
}
