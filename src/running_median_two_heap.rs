use crate::error::StatsError;
use crate::running_median::{MedianValue, RunningMedian};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Running median over an unbounded domain, split across two heaps.
///
/// `lower` is a max-heap and `upper` a min-heap. Every element of `lower` is
/// less than or equal to every element of `upper` and the heap sizes never
/// differ by more than one, so the median always sits at one or both tops.
/// Updates are O(log n), the median is O(1), and every value is retained.
#[derive(Debug, Clone)]
pub struct TwoHeapMedian<T: MedianValue> {
    lower: BinaryHeap<T>,
    upper: BinaryHeap<Reverse<T>>,
}

impl<T: MedianValue> TwoHeapMedian<T> {
    pub fn new() -> Self {
        TwoHeapMedian {
            lower: BinaryHeap::new(),
            upper: BinaryHeap::new(),
        }
    }

    fn lower_max(&self) -> Option<T> {
        self.lower.peek().copied()
    }

    fn upper_min(&self) -> Option<T> {
        self.upper.peek().map(|Reverse(v)| *v)
    }

    fn store(&mut self, value: T) {
        let Some(lower_max) = self.lower_max() else {
            // Only reachable while both halves are empty.
            self.lower.push(value);
            return;
        };

        let lower_len = self.lower.len();
        let upper_len = self.upper.len();

        if lower_len == upper_len {
            if value <= lower_max {
                self.lower.push(value);
            } else {
                self.upper.push(Reverse(value));
            }
        } else if lower_len > upper_len {
            // The new element has to end up in the upper half.
            if value < lower_max {
                if let Some(moved) = self.lower.pop() {
                    self.upper.push(Reverse(moved));
                }
                self.lower.push(value);
            } else {
                self.upper.push(Reverse(value));
            }
        } else {
            // The new element has to end up in the lower half.
            match self.upper_min() {
                Some(upper_min) if value > upper_min => {
                    if let Some(Reverse(moved)) = self.upper.pop() {
                        self.lower.push(moved);
                    }
                    self.upper.push(Reverse(value));
                }
                _ => self.lower.push(value),
            }
        }
    }

    fn current(&self) -> Option<f64> {
        match (self.lower_max(), self.upper_min()) {
            (None, _) => None,
            (Some(low), None) => Some(low.to_f64()),
            (Some(low), Some(high)) => {
                let (lower_len, upper_len) = (self.lower.len(), self.upper.len());
                if lower_len == upper_len {
                    Some((low.to_f64() + high.to_f64()) / 2.0)
                } else if lower_len > upper_len {
                    Some(low.to_f64())
                } else {
                    Some(high.to_f64())
                }
            }
        }
    }
}

impl<T: MedianValue> Default for TwoHeapMedian<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: MedianValue> RunningMedian<T> for TwoHeapMedian<T> {
    fn update(&mut self, value: T) -> Result<f64, StatsError> {
        self.store(value);
        self.current()
            .ok_or_else(|| StatsError::Other("two-heap median empty after insert".to_string()))
    }

    fn median(&self) -> Option<f64> {
        self.current()
    }

    fn len(&self) -> u64 {
        (self.lower.len() + self.upper.len()) as u64
    }
}
