use crate::config::MedianStrategy;
use crate::error::StatsError;
use crate::running_median_histogram::HistogramMedian;
use crate::running_median_two_heap::TwoHeapMedian;
use std::fmt::Debug;

/// Integer types a running median can be kept over.
pub trait MedianValue: Copy + Ord + Debug + Send + 'static {
    fn to_f64(self) -> f64;
    fn to_i128(self) -> i128;
    fn from_i128(value: i128) -> Option<Self>;
}

macro_rules! impl_median_value {
    ($($t:ty),*) => {
        $(
            impl MedianValue for $t {
                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }
            }
        )*
    };
}

impl_median_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Keeps the median of every value added so far.
///
/// Implementations are single-writer: they are owned by whichever task feeds
/// them and carry no internal synchronization.
pub trait RunningMedian<T> {
    /// Adds `value` and returns the median of all values including it.
    fn update(&mut self, value: T) -> Result<f64, StatsError>;

    /// The current median, or `None` before the first update.
    fn median(&self) -> Option<f64>;

    /// Number of values added.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, M: RunningMedian<T> + ?Sized> RunningMedian<T> for Box<M> {
    fn update(&mut self, value: T) -> Result<f64, StatsError> {
        (**self).update(value)
    }

    fn median(&self) -> Option<f64> {
        (**self).median()
    }

    fn len(&self) -> u64 {
        (**self).len()
    }
}

pub type BoxedMedian<T> = Box<dyn RunningMedian<T> + Send>;

/// Build the median strategy named in the configuration.
pub fn build_median<T: MedianValue>(strategy: &MedianStrategy) -> Result<BoxedMedian<T>, StatsError> {
    match *strategy {
        MedianStrategy::Histogram { min, max, step } => {
            let convert = |v: i64, name: &str| {
                T::from_i128(v as i128).ok_or_else(|| {
                    StatsError::Config(format!("histogram {} {} does not fit the value type", name, v))
                })
            };
            let median = HistogramMedian::new(convert(min, "min")?, convert(max, "max")?, convert(step, "step")?)?;
            Ok(Box::new(median))
        }
        MedianStrategy::TwoHeap => Ok(Box::new(TwoHeapMedian::<T>::new())),
    }
}
