use ndarray::{Array2, ArrayView2};

use super::LossFn;

/// Mean absolute error loss function.
#[derive(Default, Clone, Copy)]
pub struct Mae;

impl Mae {
    /// Returns a new `Mae`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mae {
    fn name(&self) -> &'static str {
        "mae"
    }

    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        (&y_pred - &y).mapv(f32::abs).mean().unwrap_or_default()
    }

    // The subgradient at zero is taken as zero.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len() as f32;

        (&y_pred - &y).mapv(|d| {
            if d == 0. {
                0.
            } else {
                d.signum() / n
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn loss_and_subgradient() {
        let y_pred = array![[1_f32, 2.], [3., 4.]];
        let y = array![[2_f32, 2.], [1., 4.]];

        assert_eq!(Mae.loss(y_pred.view(), y.view()), 0.75);
        assert_eq!(
            Mae.loss_prime(y_pred.view(), y.view()),
            array![[-0.25_f32, 0.], [0.25, 0.]]
        );
    }
}
