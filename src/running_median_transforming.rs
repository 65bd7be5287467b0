use crate::error::StatsError;
use crate::running_median::RunningMedian;
use std::marker::PhantomData;

/// Converts each input before handing it to a numeric running median.
pub struct TransformingMedian<I, O, F, M> {
    transform: F,
    inner: M,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F, M> TransformingMedian<I, O, F, M>
where
    F: FnMut(I) -> O,
    M: RunningMedian<O>,
{
    pub fn new(transform: F, inner: M) -> Self {
        TransformingMedian {
            transform,
            inner,
            _types: PhantomData,
        }
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<I, O, F, M> RunningMedian<I> for TransformingMedian<I, O, F, M>
where
    F: FnMut(I) -> O,
    M: RunningMedian<O>,
{
    fn update(&mut self, value: I) -> Result<f64, StatsError> {
        let converted = (self.transform)(value);
        self.inner.update(converted)
    }

    fn median(&self) -> Option<f64> {
        self.inner.median()
    }

    fn len(&self) -> u64 {
        self.inner.len()
    }
}
