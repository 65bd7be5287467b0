use crate::error::StatsError;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Normalizes words before they are counted.
///
/// A word is lowercased and stripped of every character outside
/// `[a-z0-9_]`. Words left empty, made only of digits, or listed as stop
/// words are dropped.
#[derive(Debug, Clone, Default)]
pub struct WordCleaner {
    stop_words: FxHashSet<String>,
}

impl WordCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop words are cleaned the same way as input words.
    pub fn with_stop_words<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stop_words = stop_words
            .into_iter()
            .map(|w| normalize(w.as_ref()))
            .filter(|w| is_word(w))
            .collect();
        WordCleaner { stop_words }
    }

    /// Load whitespace separated stop words from a file.
    pub fn from_stop_words_file(path: &Path) -> Result<Self, StatsError> {
        let text = fs::read_to_string(path)?;
        let cleaner = Self::with_stop_words(text.split_whitespace());
        info!(path = %path.display(), stop_words = cleaner.stop_words.len(), "[cleaner] loaded stop words");
        Ok(cleaner)
    }

    pub fn stop_word_count(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// The cleaned word, or `None` when nothing countable is left.
    pub fn clean_word(&self, word: &str) -> Option<String> {
        let cleaned = normalize(word);
        (is_word(&cleaned) && !self.stop_words.contains(&cleaned)).then_some(cleaned)
    }

    pub fn words<'a>(&'a self, line: &'a str) -> impl Iterator<Item = String> + 'a {
        line.split_whitespace().filter_map(move |w| self.clean_word(w))
    }

    /// The cleaned words of `line`, joined by single spaces.
    pub fn clean_line(&self, line: &str) -> String {
        self.words(line).collect::<Vec<_>>().join(" ")
    }

    pub fn count_words(&self, line: &str) -> usize {
        self.words(line).count()
    }
}

fn normalize(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn is_word(cleaned: &str) -> bool {
    !cleaned.is_empty() && !cleaned.bytes().all(|b| b.is_ascii_digit())
}
