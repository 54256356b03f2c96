use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{NnErr, Result};

/// An in-memory supervised dataset, one flattened sample per row of `x` and `y`.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: Array2<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Returns
    /// An error if `x` and `y` don't have the same amount of rows or are empty.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(NnErr::SizeMismatch {
                what: "dataset labels",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        if x.nrows() == 0 {
            return Err(NnErr::EmptyDataset);
        }

        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn y(&self) -> ArrayView2<'_, f32> {
        self.y.view()
    }

    /// Randomly permutes the samples.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        self.x = self.x.select(Axis(0), &order);
        self.y = self.y.select(Axis(0), &order);
    }

    /// Splits the dataset in two, the first `at` samples and the rest.
    ///
    /// # Returns
    /// `None` for a side that would end up empty.
    pub fn split_at(self, at: usize) -> (Option<Dataset>, Option<Dataset>) {
        if at >= self.len() {
            return (Some(self), None);
        }

        if at == 0 {
            return (None, Some(self));
        }

        let (x0, x1) = self.x.view().split_at(Axis(0), at);
        let (y0, y1) = self.y.view().split_at(Axis(0), at);

        let first = Dataset::new(x0.to_owned(), y0.to_owned()).ok();
        let second = Dataset::new(x1.to_owned(), y1.to_owned()).ok();
        (first, second)
    }

    /// Iterates over the samples in chunks of `batch_size` rows, the last one may be smaller.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let n = batch_size.get();

        self.x
            .axis_chunks_iter(Axis(0), n)
            .zip(self.y.axis_chunks_iter(Axis(0), n))
    }
}
