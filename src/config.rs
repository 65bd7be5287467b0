use crate::error::StatsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which running median the resequencer keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MedianStrategy {
    /// Bounded histogram over `[min, max]` at `step`.
    Histogram { min: i64, max: i64, step: i64 },
    /// Unconstrained two-heap median.
    TwoHeap,
}

impl Default for MedianStrategy {
    fn default() -> Self {
        // Messages were capped well below 70 unique words.
        MedianStrategy::Histogram { min: 0, max: 70, step: 1 }
    }
}

/// Runtime configuration for the pipeline and CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub median: MedianStrategy,
    /// Worker threads; `None` lets rayon pick one per CPU.
    pub workers: Option<usize>,
    pub poll_interval_ms: u64,
    pub drain_timeout_ms: u64,
    /// Column width of the word in the word-count table.
    pub word_column_width: usize,
    /// Clean words (lowercase, alphanumerics only, no numbers) before counting.
    pub clean: bool,
    pub stop_words: Option<PathBuf>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            median: MedianStrategy::default(),
            workers: None,
            poll_interval_ms: 50,
            drain_timeout_ms: 5_000,
            word_column_width: 27,
            clean: false,
            stop_words: None,
        }
    }
}

impl StatsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, StatsError> {
        let config: StatsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, StatsError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        if let MedianStrategy::Histogram { min, max, step } = self.median {
            if step <= 0 {
                return Err(StatsError::Config(format!("median step must be positive, got {}", step)));
            }
            if min > max {
                return Err(StatsError::Config(format!("median min {} exceeds max {}", min, max)));
            }
            if (max - min) % step != 0 {
                return Err(StatsError::Config(format!(
                    "median range [{}, {}] is not a multiple of step {}",
                    min, max, step
                )));
            }
        }
        if self.workers == Some(0) {
            return Err(StatsError::Config("workers must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(StatsError::Config("poll_interval_ms must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn wants_cleaning(&self) -> bool {
        self.clean || self.stop_words.is_some()
    }
}
