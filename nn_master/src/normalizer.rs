use ndarray::{ArrayD, ArrayViewD, Axis, arr0};
use serde::{Deserialize, Serialize};

use crate::{MasterErr, Result};

/// Mean and standard deviation used to rescale raw data before it reaches a network.
///
/// Both arrays must broadcast against a batch of the data they were fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    pub mean: ArrayD<f32>,
    pub std: ArrayD<f32>,
}

impl NormStats {
    pub fn new(mean: ArrayD<f32>, std: ArrayD<f32>) -> Self {
        Self { mean, std }
    }

    /// Statistics that leave the data untouched.
    pub fn identity() -> Self {
        Self {
            mean: arr0(0.).into_dyn(),
            std: arr0(1.).into_dyn(),
        }
    }

    /// Computes the statistics of every feature along the sample axis. Features with no spread
    /// get a standard deviation of one.
    pub fn fit(data: ArrayViewD<f32>) -> Result<Self> {
        if data.ndim() == 0 {
            return Err(MasterErr::UnsupportedRank {
                what: "normalization data",
                rank: 0,
            });
        }

        let mean = data
            .mean_axis(Axis(0))
            .ok_or(MasterErr::InvalidInput("can't fit statistics on zero samples"))?;
        let std = data
            .std_axis(Axis(0), 0.)
            .mapv_into(|s| if s > 0. && s.is_finite() { s } else { 1. });

        Ok(Self { mean, std })
    }

    /// `(x - mean) / std`
    pub fn normalize(&self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let (mean, std) = self.broadcast(&x)?;

        let mut out = &x - &mean;
        out /= &std;
        Ok(out)
    }

    /// `x * std + mean`
    pub fn denormalize(&self, x: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        let (mean, std) = self.broadcast(&x)?;

        let mut out = &x * &std;
        out += &mean;
        Ok(out)
    }

    /// The statistics of channel `c` for per-feature statistics of images, `(d1, d2, d3)`.
    /// Statistics of any other rank apply to every channel and are returned as they are.
    pub fn channel(&self, c: usize) -> Result<Self> {
        let pick = |a: &ArrayD<f32>| -> Result<ArrayD<f32>> {
            if a.ndim() != 3 {
                return Ok(a.clone());
            }

            if c >= a.len_of(Axis(2)) {
                return Err(MasterErr::shape_mismatch(format!(
                    "channel {c} of normalization statistics of shape {:?}",
                    a.shape()
                )));
            }

            Ok(a.index_axis(Axis(2), c).to_owned())
        };

        Ok(Self {
            mean: pick(&self.mean)?,
            std: pick(&self.std)?,
        })
    }

    fn broadcast<'a>(&'a self, x: &ArrayViewD<f32>) -> Result<(ArrayViewD<'a, f32>, ArrayViewD<'a, f32>)> {
        let mismatch = |what: &str, shape: &[usize]| {
            MasterErr::shape_mismatch(format!(
                "normalization {what} of shape {shape:?} can't be applied to data of shape {:?}",
                x.shape()
            ))
        };

        let mean = self
            .mean
            .broadcast(x.raw_dim())
            .ok_or_else(|| mismatch("mean", self.mean.shape()))?;
        let std = self
            .std
            .broadcast(x.raw_dim())
            .ok_or_else(|| mismatch("std", self.std.shape()))?;

        Ok((mean, std))
    }
}
