use crate::cleaner::WordCleaner;
use crate::config::StatsConfig;
use crate::error::StatsError;
use crate::resequencer::{ResequencerReport, Resequencer};
use crate::running_median::{BoxedMedian, RunningMedian, build_median};
use crate::running_median_transforming::TransformingMedian;
use crate::sorted_words::SortedWordSet;
use crate::word_table::WordFrequencyTable;
use crate::worker_pool::{MessageWorkerPool, TaskDelay};
use crossbeam_channel::unbounded;
use std::io::{self, Write};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub messages: u64,
    pub distinct_words: usize,
    pub total_words: u64,
    pub drain: ResequencerReport,
}

/// Wires a line source through the worker pool and resequencer.
pub struct Pipeline {
    config: StatsConfig,
    cleaner: Option<WordCleaner>,
    task_delay: Option<TaskDelay>,
}

impl Pipeline {
    pub fn new(config: StatsConfig) -> Result<Self, StatsError> {
        config.validate()?;
        let cleaner = if !config.wants_cleaning() {
            None
        } else if let Some(path) = &config.stop_words {
            Some(WordCleaner::from_stop_words_file(path)?)
        } else {
            Some(WordCleaner::new())
        };
        Ok(Pipeline {
            config,
            cleaner,
            task_delay: None,
        })
    }

    pub fn with_task_delay(mut self, delay: TaskDelay) -> Self {
        self.task_delay = Some(delay);
        self
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn cleaner(&self) -> Option<&WordCleaner> {
        self.cleaner.as_ref()
    }

    /// Count every line's words and write the word table to `word_sink`, while
    /// the running median of unique words per line goes to `median_sink`.
    ///
    /// The median sink is handed back once the resequencer is done with it.
    /// The word table is written even when the median run fails; that error
    /// is returned afterwards.
    pub fn run<I, W1, W2>(&self, lines: I, mut word_sink: W1, median_sink: W2) -> Result<(PipelineSummary, W2), StatsError>
    where
        I: IntoIterator<Item = String>,
        W1: Write,
        W2: Write + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let mut pool = MessageWorkerPool::new(self.config.workers, tx)?
            .with_drain_timeout(self.config.drain_timeout());
        if let Some(delay) = &self.task_delay {
            pool = pool.with_task_delay(delay.clone());
        }

        let median: BoxedMedian<usize> = build_median(&self.config.median)?;
        let resequencer = Resequencer::new(rx, pool.status(), median, median_sink)
            .with_poll_interval(self.config.poll_interval())
            .with_drain_timeout(self.config.drain_timeout());
        let handle = resequencer.spawn()?;

        let submitted = self.submit_all(&pool, lines);
        pool.drain();
        let words = pool.word_counts();
        let sorted = pool.sorted_words();

        let medians = handle
            .join()
            .map_err(|_| StatsError::Other("resequencer thread panicked".to_string()))
            .and_then(|result| result);
        write_word_counts(words, sorted, self.config.word_column_width, &mut word_sink)?;

        let (drain, median_sink) = medians?;
        let messages = submitted?;

        let summary = PipelineSummary {
            messages,
            distinct_words: sorted.len(),
            total_words: words.total(),
            drain,
        };
        info!(
            messages = summary.messages,
            distinct_words = summary.distinct_words,
            released = summary.drain.released,
            "[pipeline] finished"
        );
        Ok((summary, median_sink))
    }

    /// Word-count table only; medians are computed and discarded.
    pub fn count_words<I, W>(&self, lines: I, word_sink: W) -> Result<PipelineSummary, StatsError>
    where
        I: IntoIterator<Item = String>,
        W: Write,
    {
        let (summary, _) = self.run(lines, word_sink, io::sink())?;
        Ok(summary)
    }

    fn submit_all<I>(&self, pool: &MessageWorkerPool, lines: I) -> Result<u64, StatsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut submitted = 0u64;
        for line in lines {
            let line = match &self.cleaner {
                Some(cleaner) => cleaner.clean_line(&line),
                None => line,
            };
            if let Err(e) = pool.submit(line) {
                warn!(submitted, error = %e, "[pipeline] stopped submitting");
                return Err(e);
            }
            submitted += 1;
        }
        Ok(submitted)
    }
}

/// Write `word count` lines in ascending word order, words left-aligned in
/// a column of `width`.
pub fn write_word_counts<W: Write>(
    words: &WordFrequencyTable,
    sorted: &SortedWordSet,
    width: usize,
    out: &mut W,
) -> Result<(), StatsError> {
    for word in sorted.to_vec() {
        writeln!(out, "{:<width$} {}", word, words.count(&word), width = width)?;
    }
    out.flush()?;
    Ok(())
}

/// Sequential running median of the cleaned word count of each line.
///
/// Returns how many lines were written.
pub fn median_words_per_line<I, W>(
    lines: I,
    cleaner: &WordCleaner,
    median: BoxedMedian<usize>,
    mut out: W,
) -> Result<u64, StatsError>
where
    I: IntoIterator<Item = String>,
    W: Write,
{
    let mut median = TransformingMedian::new(|line: String| cleaner.count_words(&line), median);
    for line in lines {
        let value = median.update(line)?;
        writeln!(out, "{:.2}", value)?;
    }
    out.flush()?;
    Ok(median.len())
}
