use crate::error::StatsError;
use crate::running_median::RunningMedian;
use crate::sequenced::SequencedCount;
use crate::worker_pool::PoolStatus;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use rustc_hash::FxHashMap;
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResequencerState {
    Running,
    Draining,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The pool finished every task before the resequencer stopped.
    Complete,
    /// The pool was still busy when the drain timeout ran out.
    TimedOut { submitted: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResequencerReport {
    /// Messages whose median was written, a prefix 0..released of the submissions.
    pub released: u64,
    /// Counts received but never released because an earlier one was missing.
    pub pending: usize,
    pub outcome: DrainOutcome,
}

impl ResequencerReport {
    pub fn timed_out(&self) -> bool {
        matches!(self.outcome, DrainOutcome::TimedOut { .. })
    }

    /// Turn a timed-out drain into an error.
    pub fn into_result(self) -> Result<Self, StatsError> {
        match self.outcome {
            DrainOutcome::Complete => Ok(self),
            DrainOutcome::TimedOut { submitted } => Err(StatsError::DrainTimeout {
                released: self.released,
                submitted,
            }),
        }
    }
}

/// Restores submission order to the counts coming off the worker pool and
/// writes the running median after each message, in order.
///
/// The resequencer is the only reader of the completion queue and the only
/// writer of the median and the sink.
pub struct Resequencer<M, W> {
    completions: Receiver<SequencedCount>,
    status: Arc<PoolStatus>,
    median: M,
    sink: W,
    pending: FxHashMap<u64, usize>,
    expected: u64,
    state: ResequencerState,
    poll_interval: Duration,
    drain_timeout: Duration,
    timed_out: bool,
}

impl<M, W> Resequencer<M, W>
where
    M: RunningMedian<usize>,
    W: Write,
{
    pub fn new(completions: Receiver<SequencedCount>, status: Arc<PoolStatus>, median: M, sink: W) -> Self {
        Resequencer {
            completions,
            status,
            median,
            sink,
            pending: FxHashMap::default(),
            expected: 0,
            state: ResequencerState::Running,
            poll_interval: Duration::from_millis(50),
            drain_timeout: Duration::from_secs(5),
            timed_out: false,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn state(&self) -> ResequencerState {
        self.state
    }

    /// Next sequence number to be released.
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Buffer one count and release everything now in order.
    pub fn accept(&mut self, record: SequencedCount) -> Result<(), StatsError> {
        if record.sequence < self.expected || self.pending.contains_key(&record.sequence) {
            warn!(sequence = record.sequence, "[resequencer] duplicate count ignored");
            return Ok(());
        }
        self.pending.insert(record.sequence, record.count);
        self.release()
    }

    fn release(&mut self) -> Result<(), StatsError> {
        while let Some(count) = self.pending.remove(&self.expected) {
            let median = self.median.update(count)?;
            writeln!(self.sink, "{:.2}", median)?;
            self.expected += 1;
        }
        Ok(())
    }

    /// One step of the running state: wait briefly for a count, then decide
    /// whether the pool is done or out of time.
    fn poll(&mut self) -> Result<(), StatsError> {
        match self.completions.recv_timeout(self.poll_interval) {
            Ok(record) => {
                self.accept(record)?;
                self.check_pool();
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                self.check_pool();
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("[resequencer] completion queue disconnected");
                self.state = ResequencerState::Draining;
                Ok(())
            }
        }
    }

    fn check_pool(&mut self) {
        if self.status.is_terminated() {
            self.state = ResequencerState::Draining;
            return;
        }
        let Some(closed_at) = self.status.closed_at() else {
            return;
        };
        if closed_at.elapsed() >= self.drain_timeout {
            warn!(
                released = self.expected,
                submitted = self.status.submitted(),
                in_flight = self.status.in_flight(),
                "[resequencer] drain timed out, finalizing partial output"
            );
            self.timed_out = true;
            self.state = ResequencerState::Draining;
        }
    }

    fn drain(&mut self) -> Result<(), StatsError> {
        while let Ok(record) = self.completions.try_recv() {
            self.accept(record)?;
        }
        Ok(())
    }

    fn step_all(&mut self) -> Result<(), StatsError> {
        while self.state == ResequencerState::Running {
            self.poll()?;
        }
        self.drain()
    }

    /// Run until the pool has terminated (or the drain timed out), then flush
    /// the sink and hand it back.
    pub fn run(mut self) -> Result<(ResequencerReport, W), StatsError> {
        let result = self.step_all();
        let flushed = self.sink.flush();
        self.state = ResequencerState::Terminated;
        result?;
        flushed?;

        let outcome = if self.timed_out {
            DrainOutcome::TimedOut { submitted: self.status.submitted() }
        } else {
            DrainOutcome::Complete
        };
        if !self.pending.is_empty() && !self.timed_out {
            warn!(
                released = self.expected,
                pending = self.pending.len(),
                "[resequencer] counts left behind a missing sequence"
            );
        }
        info!(released = self.expected, "[resequencer] finished");
        let report = ResequencerReport {
            released: self.expected,
            pending: self.pending.len(),
            outcome,
        };
        Ok((report, self.sink))
    }
}

impl<M, W> Resequencer<M, W>
where
    M: RunningMedian<usize> + Send + 'static,
    W: Write + Send + 'static,
{
    /// Run on a dedicated thread.
    pub fn spawn(self) -> Result<JoinHandle<Result<(ResequencerReport, W), StatsError>>, StatsError> {
        let handle = thread::Builder::new()
            .name("resequencer".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::running_median_histogram::HistogramMedian;
    use crate::running_median_two_heap::TwoHeapMedian;
    use crossbeam_channel::unbounded;
    use std::time::Instant;

    fn output(sink: Vec<u8>) -> Vec<String> {
        String::from_utf8(sink).unwrap().lines().map(str::to_owned).collect()
    }

    fn closed_status() -> Arc<PoolStatus> {
        let status = Arc::new(PoolStatus::new());
        status.close();
        status
    }

    #[test]
    fn test_releases_only_in_order() {
        let (_tx, rx) = unbounded();
        let mut reseq = Resequencer::new(rx, Arc::new(PoolStatus::new()), TwoHeapMedian::new(), Vec::new());
        reseq.accept(SequencedCount::new(2, 3)).unwrap();
        reseq.accept(SequencedCount::new(1, 1)).unwrap();
        assert_eq!(reseq.expected(), 0);
        assert!(reseq.sink.is_empty());
        reseq.accept(SequencedCount::new(0, 2)).unwrap();
        assert_eq!(reseq.expected(), 3);
        assert!(reseq.pending.is_empty());
        assert_eq!(output(reseq.sink), vec!["2.00", "1.50", "2.00"]);
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let (_tx, rx) = unbounded();
        let mut reseq = Resequencer::new(rx, Arc::new(PoolStatus::new()), TwoHeapMedian::new(), Vec::new());
        reseq.accept(SequencedCount::new(0, 4)).unwrap();
        reseq.accept(SequencedCount::new(0, 9)).unwrap();
        reseq.accept(SequencedCount::new(2, 1)).unwrap();
        reseq.accept(SequencedCount::new(2, 7)).unwrap();
        assert_eq!(reseq.pending.get(&2), Some(&1));
        assert_eq!(output(reseq.sink), vec!["4.00"]);
    }

    #[test]
    fn test_run_drains_queue_after_termination() {
        let (tx, rx) = unbounded();
        for (seq, count) in [(3u64, 4usize), (0, 2), (2, 3), (1, 1)] {
            tx.send(SequencedCount::new(seq, count)).unwrap();
        }
        let reseq = Resequencer::new(rx, closed_status(), TwoHeapMedian::new(), Vec::new())
            .with_poll_interval(Duration::from_millis(5));
        let (report, sink) = reseq.run().unwrap();
        assert_eq!(report.released, 4);
        assert_eq!(report.pending, 0);
        assert_eq!(report.outcome, DrainOutcome::Complete);
        assert_eq!(output(sink), vec!["2.00", "1.50", "2.00", "2.50"]);
    }

    #[test]
    fn test_disconnect_moves_to_draining() {
        let (tx, rx) = unbounded();
        tx.send(SequencedCount::new(0, 5)).unwrap();
        drop(tx);
        let reseq = Resequencer::new(rx, Arc::new(PoolStatus::new()), TwoHeapMedian::new(), Vec::new())
            .with_poll_interval(Duration::from_millis(5));
        let (report, sink) = reseq.run().unwrap();
        assert_eq!(report.released, 1);
        assert_eq!(output(sink), vec!["5.00"]);
    }

    #[test]
    fn test_drain_timeout_keeps_released_prefix() {
        let (tx, rx) = unbounded();
        let status = Arc::new(PoolStatus::new());
        // A task that never finishes keeps the pool from terminating.
        status.begin_task();
        status.close();
        tx.send(SequencedCount::new(0, 1)).unwrap();
        tx.send(SequencedCount::new(2, 3)).unwrap();
        let reseq = Resequencer::new(rx, Arc::clone(&status), TwoHeapMedian::new(), Vec::new())
            .with_poll_interval(Duration::from_millis(5))
            .with_drain_timeout(Duration::from_millis(40));
        let (report, sink) = reseq.run().unwrap();
        assert!(report.timed_out());
        assert_eq!(report.released, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(output(sink), vec!["1.00"]);
        assert!(matches!(
            report.into_result(),
            Err(StatsError::DrainTimeout { released: 1, .. })
        ));
        drop(tx);
    }

    #[test]
    fn test_drain_timeout_holds_while_counts_keep_arriving() {
        let (tx, rx) = unbounded();
        let status = Arc::new(PoolStatus::new());
        status.begin_task();
        status.close();
        // Sequence 0 never arrives, so nothing is released while the queue stays busy.
        let sender = thread::spawn(move || {
            for sequence in 1..1_000u64 {
                if tx.send(SequencedCount::new(sequence, 1)).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(2));
            }
        });
        let started = Instant::now();
        let reseq = Resequencer::new(rx, Arc::clone(&status), TwoHeapMedian::new(), Vec::new())
            .with_poll_interval(Duration::from_millis(50))
            .with_drain_timeout(Duration::from_millis(100));
        let (report, sink) = reseq.run().unwrap();
        let elapsed = started.elapsed();
        sender.join().unwrap();
        assert!(report.timed_out());
        assert_eq!(report.released, 0);
        assert!(sink.is_empty());
        assert!(elapsed < Duration::from_millis(400), "ran for {:?}", elapsed);
    }

    #[test]
    fn test_out_of_domain_stops_with_error() {
        let (tx, rx) = unbounded();
        tx.send(SequencedCount::new(0, 2)).unwrap();
        tx.send(SequencedCount::new(1, 9)).unwrap();
        let median = HistogramMedian::new(0usize, 3, 1).unwrap();
        let reseq = Resequencer::new(rx, closed_status(), median, Vec::new())
            .with_poll_interval(Duration::from_millis(5));
        let err = reseq.run().unwrap_err();
        assert!(matches!(err, StatsError::OutOfDomain { value: 9, .. }));
    }

    #[test]
    fn test_spawned_resequencer_waits_for_pool() {
        let (tx, rx) = unbounded();
        let status = Arc::new(PoolStatus::new());
        let handle = Resequencer::new(rx, Arc::clone(&status), TwoHeapMedian::new(), Vec::new())
            .with_poll_interval(Duration::from_millis(5))
            .spawn()
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        tx.send(SequencedCount::new(1, 6)).unwrap();
        tx.send(SequencedCount::new(0, 2)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(!handle.is_finished());
        status.close();
        let (report, sink) = handle.join().unwrap().unwrap();
        assert_eq!(report.released, 2);
        assert_eq!(output(sink), vec!["2.00", "4.00"]);
    }
}
