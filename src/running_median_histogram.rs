use crate::error::StatsError;
use crate::running_median::{MedianValue, RunningMedian};
use std::marker::PhantomData;

/// Running median over a bounded, evenly stepped integer domain.
///
/// Instead of retaining every input it keeps one counter per possible value
/// in `[min, max]` at `step`, plus a running total. Updates are O(1) apart
/// from the median scan, which is bounded by the number of buckets rather
/// than the number of inputs; memory never grows after construction.
#[derive(Debug, Clone)]
pub struct HistogramMedian<T: MedianValue> {
    buckets: Vec<u64>,
    min: i128,
    max: i128,
    step: i128,
    total: u64,
    current: Option<f64>,
    _value: PhantomData<T>,
}

impl<T: MedianValue> HistogramMedian<T> {
    pub fn new(min: T, max: T, step: T) -> Result<Self, StatsError> {
        let (min, max, step) = (min.to_i128(), max.to_i128(), step.to_i128());
        if step <= 0 {
            return Err(StatsError::Config(format!("histogram step must be positive, got {}", step)));
        }
        if min > max {
            return Err(StatsError::Config(format!("histogram min {} exceeds max {}", min, max)));
        }
        if (max - min) % step != 0 {
            return Err(StatsError::Config(format!(
                "histogram range [{}, {}] is not a multiple of step {}",
                min, max, step
            )));
        }
        let len = usize::try_from((max - min) / step + 1)
            .map_err(|_| StatsError::Config("histogram has too many buckets".to_string()))?;
        Ok(HistogramMedian {
            buckets: vec![0; len],
            min,
            max,
            step,
            total: 0,
            current: None,
            _value: PhantomData,
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// How many times `value` has been added; zero for values outside the domain.
    pub fn count_of(&self, value: T) -> u64 {
        self.index_of(value.to_i128())
            .map(|idx| self.buckets[idx])
            .unwrap_or(0)
    }

    fn index_of(&self, value: i128) -> Option<usize> {
        if value < self.min || value > self.max || (value - self.min) % self.step != 0 {
            return None;
        }
        usize::try_from((value - self.min) / self.step).ok()
    }

    fn value_at(&self, idx: usize) -> f64 {
        (self.min + idx as i128 * self.step) as f64
    }

    fn compute(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let mut cumulative = 0u64;
        for (idx, &count) in self.buckets.iter().enumerate() {
            cumulative += count;
            if 2 * cumulative < self.total {
                continue;
            }
            if 2 * cumulative == self.total {
                // Even total split exactly here: average with the next occupied bucket.
                let next = self.buckets[idx + 1..]
                    .iter()
                    .position(|&c| c > 0)
                    .map(|offset| idx + 1 + offset)?;
                return Some((self.value_at(idx) + self.value_at(next)) / 2.0);
            }
            return Some(self.value_at(idx));
        }
        None
    }
}

impl<T: MedianValue> RunningMedian<T> for HistogramMedian<T> {
    fn update(&mut self, value: T) -> Result<f64, StatsError> {
        let raw = value.to_i128();
        let idx = self.index_of(raw).ok_or(StatsError::OutOfDomain {
            value: raw,
            min: self.min,
            max: self.max,
            step: self.step,
        })?;
        self.buckets[idx] += 1;
        self.total += 1;
        self.current = self.compute();
        self.current
            .ok_or_else(|| StatsError::Other("histogram median empty after insert".to_string()))
    }

    fn median(&self) -> Option<f64> {
        self.current
    }

    fn len(&self) -> u64 {
        self.total
    }
}
