use crate::error::StatsError;
use crate::sequenced::{SequenceCounter, SequencedCount};
use crate::sorted_words::SortedWordSet;
use crate::splitter::{Splitter, Tokenizer};
use crate::word_table::WordFrequencyTable;
use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub type TaskDelay = Arc<dyn Fn(u64) -> Duration + Send + Sync>;

/// Submission and completion bookkeeping shared between the pool and the
/// resequencer.
#[derive(Debug, Default)]
pub struct PoolStatus {
    closed: AtomicBool,
    closed_at: Mutex<Option<Instant>>,
    in_flight: AtomicUsize,
    submitted: AtomicU64,
    completed: AtomicU64,
    lock: Mutex<()>,
    idle: Condvar,
}

impl PoolStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closed and every accepted task has finished.
    pub fn is_terminated(&self) -> bool {
        self.is_closed() && self.in_flight.load(Ordering::SeqCst) == 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// When the pool first stopped accepting messages.
    pub fn closed_at(&self) -> Option<Instant> {
        *self.closed_at.lock()
    }

    pub fn close(&self) {
        // Stamped before the flag so anyone who sees it closed also sees the time.
        self.closed_at.lock().get_or_insert_with(Instant::now);
        self.closed.store(true, Ordering::SeqCst);
        self.wake();
    }

    /// Block until terminated or `timeout` elapses. Returns whether the pool terminated.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_terminated() {
            if self.idle.wait_until(&mut guard, deadline).timed_out() {
                return self.is_terminated();
            }
        }
        true
    }

    pub(crate) fn begin_task(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn abandon_task(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.wake();
        }
    }

    fn finish_task(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.abandon_task();
    }

    fn wake(&self) {
        let _guard = self.lock.lock();
        self.idle.notify_all();
    }
}

struct TaskContext {
    words: Arc<WordFrequencyTable>,
    sorted_words: Arc<SortedWordSet>,
    tokenizer: Arc<dyn Tokenizer>,
    completions: Sender<SequencedCount>,
    status: Arc<PoolStatus>,
    delay: Option<TaskDelay>,
}

impl TaskContext {
    fn count_message(&self, line: &str) -> Result<usize, StatsError> {
        let mut uniques: FxHashSet<&str> = FxHashSet::default();
        for token in self.tokenizer.tokens(line)? {
            self.words.increment(token);
            self.sorted_words.insert(token);
            uniques.insert(token);
        }
        Ok(uniques.len())
    }

    fn run(&self, sequence: u64, line: &str) {
        if let Some(delay) = &self.delay {
            thread::sleep(delay(sequence));
        }
        let count = match panic::catch_unwind(AssertUnwindSafe(|| self.count_message(line))) {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                warn!(sequence, error = %e, "[pool] tokenization failed, reporting zero unique words");
                0
            }
            Err(_) => {
                warn!(sequence, "[pool] tokenization panicked, reporting zero unique words");
                0
            }
        };
        // Every accepted message reports exactly once, or the resequencer stalls.
        if self.completions.send(SequencedCount::new(sequence, count)).is_err() {
            debug!(sequence, "[pool] completion queue disconnected, count dropped");
        }
        self.status.finish_task();
    }
}

/// Counts the words of each submitted message on a work-stealing pool and
/// reports every message's unique word count on the completion queue.
pub struct MessageWorkerPool {
    pool: rayon::ThreadPool,
    counter: SequenceCounter,
    status: Arc<PoolStatus>,
    words: Arc<WordFrequencyTable>,
    sorted_words: Arc<SortedWordSet>,
    tokenizer: Arc<dyn Tokenizer>,
    completions: Sender<SequencedCount>,
    delay: Option<TaskDelay>,
    drain_timeout: Duration,
    drain_warned: AtomicBool,
}

impl MessageWorkerPool {
    pub fn new(workers: Option<usize>, completions: Sender<SequencedCount>) -> Result<Self, StatsError> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("word-worker-{}", i));
        if let Some(n) = workers {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| StatsError::Config(format!("failed to build worker pool: {}", e)))?;
        info!(workers = pool.current_num_threads(), "[pool] worker pool started");
        Ok(MessageWorkerPool {
            pool,
            counter: SequenceCounter::new(),
            status: Arc::new(PoolStatus::new()),
            words: Arc::new(WordFrequencyTable::new()),
            sorted_words: Arc::new(SortedWordSet::new()),
            tokenizer: Arc::new(Splitter::new()),
            completions,
            delay: None,
            drain_timeout: Duration::from_secs(5),
            drain_warned: AtomicBool::new(false),
        })
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Sleep each task for `delay(sequence)` before counting.
    pub fn with_task_delay(mut self, delay: TaskDelay) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_sequence_capacity(mut self, capacity: u64) -> Self {
        self.counter = SequenceCounter::with_capacity(capacity);
        self
    }

    /// Assign the next sequence number to `line` and schedule it. Does not
    /// wait for the message to be counted.
    pub fn submit(&self, line: impl Into<String>) -> Result<u64, StatsError> {
        // Registered before the closed check so termination can't be observed
        // between the check and the spawn.
        self.status.begin_task();
        if self.status.is_closed() {
            self.status.abandon_task();
            return Err(StatsError::PoolClosed);
        }
        let sequence = match self.counter.next() {
            Ok(sequence) => sequence,
            Err(e) => {
                self.status.abandon_task();
                return Err(e);
            }
        };
        self.status.submitted.fetch_add(1, Ordering::SeqCst);

        let line = line.into();
        let context = TaskContext {
            words: Arc::clone(&self.words),
            sorted_words: Arc::clone(&self.sorted_words),
            tokenizer: Arc::clone(&self.tokenizer),
            completions: self.completions.clone(),
            status: Arc::clone(&self.status),
            delay: self.delay.clone(),
        };
        self.pool.spawn(move || context.run(sequence, &line));
        Ok(sequence)
    }

    pub fn status(&self) -> Arc<PoolStatus> {
        Arc::clone(&self.status)
    }

    /// Stop accepting messages. Tasks already submitted still run.
    pub fn close(&self) {
        if !self.status.is_closed() {
            debug!(submitted = self.status.submitted(), "[pool] closing to new messages");
        }
        self.status.close();
    }

    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.status.await_termination(timeout)
    }

    pub fn is_terminated(&self) -> bool {
        self.status.is_terminated()
    }

    /// Close the pool and wait for it to drain, at most until the drain
    /// timeout has passed since the pool was closed. Later calls share the
    /// same deadline.
    pub fn drain(&self) -> bool {
        self.close();
        let deadline = self.status.closed_at().unwrap_or_else(Instant::now) + self.drain_timeout;
        let terminated = self.await_termination(deadline.saturating_duration_since(Instant::now()));
        if !terminated && !self.drain_warned.swap(true, Ordering::SeqCst) {
            warn!(
                in_flight = self.status.in_flight(),
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "[pool] tasks still running after drain timeout"
            );
        }
        terminated
    }

    /// Word counts of every message. Closes the pool to new messages.
    pub fn word_counts(&self) -> &WordFrequencyTable {
        self.drain();
        &self.words
    }

    /// Sorted distinct words of every message. Closes the pool to new messages.
    pub fn sorted_words(&self) -> &SortedWordSet {
        self.drain();
        &self.sorted_words
    }
}
