//! Per-sample statistical error and accuracy functions.
//!
//! Every function takes the expected and the predicted values with the same shape, reduces the
//! last axis and returns one value per sample.
//!
//! # Panics
//! When `y_true` and `y_pred` shapes can't be broadcast together.

use ndarray::{Array, ArrayView, Axis, Dimension, RemoveAxis, Zip};

use super::EPSILON;

fn last_axis<D: Dimension>(y: &ArrayView<f32, D>) -> Axis {
    Axis(y.ndim().saturating_sub(1))
}

fn mean_last<D>(values: Array<f32, D>) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    let axis = Axis(values.ndim().saturating_sub(1));
    let reduced = values.raw_dim().remove_axis(axis);

    values
        .mean_axis(axis)
        .unwrap_or_else(|| Array::from_elem(reduced, f32::NAN))
}

/// `mean((y_true - y_pred)^2)` along the last axis.
pub fn mean_squared_error<D>(y_true: ArrayView<f32, D>, y_pred: ArrayView<f32, D>) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    mean_last((&y_true - &y_pred).mapv_into(|d| d * d))
}

/// `mean(|y_true - y_pred|)` along the last axis.
pub fn mean_absolute_error<D>(y_true: ArrayView<f32, D>, y_pred: ArrayView<f32, D>) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    mean_last((&y_true - &y_pred).mapv_into(f32::abs))
}

/// `100 * mean(|y_true - y_pred| / max(|y_true|, eps))` along the last axis.
pub fn mean_absolute_percentage_error<D>(
    y_true: ArrayView<f32, D>,
    y_pred: ArrayView<f32, D>,
) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    let mut diff = (&y_true - &y_pred).mapv_into(f32::abs);
    diff.zip_mut_with(&y_true, |d, &t| *d /= t.abs().max(EPSILON));
    mean_last(diff) * 100.
}

/// `mean((ln(1 + max(y_pred, eps)) - ln(1 + max(y_true, eps)))^2)` along the last axis.
pub fn mean_squared_logarithmic_error<D>(
    y_true: ArrayView<f32, D>,
    y_pred: ArrayView<f32, D>,
) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    let log1p = |v: f32| v.max(EPSILON).ln_1p();
    let first = y_pred.mapv(log1p);
    let second = y_true.mapv(log1p);
    mean_last((first - second).mapv_into(|d| d * d))
}

/// 1 where the index of the largest value of the last axis matches, 0 otherwise.
pub fn categorical_accuracy<D>(y_true: ArrayView<f32, D>, y_pred: ArrayView<f32, D>) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    let axis = last_axis(&y_true);

    Zip::from(y_true.lanes(axis))
        .and(y_pred.lanes(axis))
        .map_collect(|t, p| (argmax(t.iter()) == argmax(p.iter())) as u8 as f32)
}

/// The fraction of the last axis where `y_true` equals `y_pred` thresholded at 0.5.
pub fn binary_accuracy<D>(y_true: ArrayView<f32, D>, y_pred: ArrayView<f32, D>) -> Array<f32, D::Smaller>
where
    D: Dimension + RemoveAxis,
{
    let mut hits = y_pred.mapv(|p| if p > 0.5 { 1. } else { 0. });
    hits.zip_mut_with(&y_true, |h, &t| *h = (*h == t) as u8 as f32);
    mean_last(hits)
}

fn argmax<'a, I: Iterator<Item = &'a f32>>(values: I) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
