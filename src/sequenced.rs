use crate::error::StatsError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique word count of one message, tagged with the message's submission
/// position. Workers finish in any order; the sequence lets the resequencer
/// put the counts back in line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequencedCount {
    pub sequence: u64,
    pub count: usize,
}

impl SequencedCount {
    pub fn new(sequence: u64, count: usize) -> Self {
        SequencedCount { sequence, count }
    }
}

/// Hands out sequence numbers 0, 1, 2, ... up to a fixed capacity.
///
/// Running past the capacity is an error rather than a wraparound, which
/// would silently alias two messages.
#[derive(Debug)]
pub struct SequenceCounter {
    next: AtomicU64,
    capacity: u64,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::with_capacity(u64::MAX)
    }

    /// At most `capacity` sequence numbers will be issued.
    pub fn with_capacity(capacity: u64) -> Self {
        SequenceCounter {
            next: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn next(&self) -> Result<u64, StatsError> {
        let capacity = self.capacity;
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < capacity).then_some(n + 1))
            .map_err(|_| StatsError::Capacity(capacity))
    }

    /// How many sequence numbers have been issued.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counts_from_zero() {
        let counter = SequenceCounter::new();
        assert_eq!(counter.next().unwrap(), 0);
        assert_eq!(counter.next().unwrap(), 1);
        assert_eq!(counter.issued(), 2);
    }

    #[test]
    fn test_capacity_is_a_hard_limit() {
        let counter = SequenceCounter::with_capacity(2);
        assert_eq!(counter.next().unwrap(), 0);
        assert_eq!(counter.next().unwrap(), 1);
        assert!(matches!(counter.next(), Err(StatsError::Capacity(2))));
        assert!(matches!(counter.next(), Err(StatsError::Capacity(2))));
        assert_eq!(counter.issued(), 2);
    }

    #[test]
    fn test_concurrent_numbers_are_unique() {
        let counter = Arc::new(SequenceCounter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || (0..250).map(|_| counter.next().unwrap()).collect::<Vec<_>>())
            })
            .collect();
        let all: HashSet<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 1_000);
        assert_eq!(all.iter().max(), Some(&999));
    }
}
