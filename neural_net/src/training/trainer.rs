use std::num::NonZeroUsize;

use log::debug;
use rand::Rng;

use crate::{
    Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    optimization::Optimizer,
};

/// What happened during one epoch of training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    pub val_loss: Option<f32>,
}

/// A model `Trainer`. Contains the relevant components needed for training a model over a
/// parameter vector it doesn't own.
pub struct Trainer<O, L, R>
where
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    optimizer: O,
    loss_fn: L,
    epochs: usize,
    batch_size: NonZeroUsize,
    rng: R,
}

impl<O, L, R> Trainer<O, L, R>
where
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `Trainer`.
    ///
    /// # Arguments
    /// * `optimizer` - Dictates how the parameters are updated after each batch.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `epochs` - The amount of passes over the dataset per `train` call.
    /// * `batch_size` - The amount of samples per gradient computation.
    /// * `rng` - A random number generator used to shuffle the dataset each epoch.
    pub fn new(optimizer: O, loss_fn: L, epochs: usize, batch_size: NonZeroUsize, rng: R) -> Self {
        Self {
            optimizer,
            loss_fn,
            epochs,
            batch_size,
            rng,
        }
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Performs `epochs` epochs of training of `model`.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `params` - The model's parameters, updated in place.
    /// * `dataset` - The training samples, shuffled every epoch.
    /// * `validation` - Samples the loss is measured on after every epoch, if any.
    /// * `on_epoch` - Called with the statistics of every finished epoch.
    ///
    /// # Returns
    /// The statistics of every epoch.
    pub fn train<M, F>(
        &mut self,
        model: &M,
        params: &mut [f32],
        dataset: &mut Dataset,
        validation: Option<&Dataset>,
        mut on_epoch: F,
    ) -> Result<Vec<EpochStats>>
    where
        M: Model,
        F: FnMut(&EpochStats),
    {
        let mut grad = vec![0.0; model.size()];
        let mut history = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            dataset.shuffle(&mut self.rng);
            let batches = dataset.batches(self.batch_size);

            let loss = model.backprop(
                params,
                &mut grad,
                &self.loss_fn,
                &mut self.optimizer,
                batches,
            )?;

            let val_loss = match validation {
                Some(val) => {
                    let y_pred = model.forward(params, val.x())?;
                    Some(self.loss_fn.loss(y_pred.view(), val.y()))
                }
                None => None,
            };

            let stats = EpochStats {
                epoch,
                loss,
                val_loss,
            };
            debug!("epoch {epoch}: {} {loss}", self.loss_fn.name());
            on_epoch(&stats);
            history.push(stats);
        }

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        arch::{Network, Sequential, activations::ActFn, layers::Layer, loss::Mse, spec::ParamInitSpec},
        optimization::{Adam, GradientDescent},
    };
    use ndarray::Array2;
    use rand::{SeedableRng, rngs::StdRng};

    fn linear_dataset() -> Dataset {
        let x = Array2::from_shape_fn((32, 2), |(i, j)| ((i * 3 + j * 5) % 11) as f32 / 10.);
        let y = Array2::from_shape_fn((32, 1), |(i, _)| 2. * x[[i, 0]] - x[[i, 1]] + 0.5);
        Dataset::new(x, y).unwrap()
    }

    fn network(hidden: bool) -> Network {
        let mut layers = vec![Layer::input("input", vec![2])];
        if hidden {
            layers.push(Layer::dense("hidden", (2, 8), Some(ActFn::tanh())));
            layers.push(Layer::dense("output", (8, 1), None));
        } else {
            layers.push(Layer::dense("output", (2, 1), None));
        }

        let arch = Sequential::new(layers).unwrap();
        Network::init(arch, ParamInitSpec::XavierUniform, &mut StdRng::seed_from_u64(5)).unwrap()
    }

    #[test]
    fn gradient_descent_fits_a_line() {
        let mut net = network(false);
        let mut ds = linear_dataset();
        let mut trainer = Trainer::new(
            GradientDescent::new(0.5),
            Mse,
            300,
            NonZeroUsize::new(8).unwrap(),
            StdRng::seed_from_u64(1),
        );

        let (arch, params) = net.parts_mut();
        let history = trainer.train(arch, params, &mut ds, None, |_| {}).unwrap();

        assert_eq!(history.len(), 300);
        assert!(history[299].loss < 1e-2);
        assert!(history[299].val_loss.is_none());
    }

    #[test]
    fn adam_reduces_the_loss_and_reports_validation() {
        let mut net = network(true);
        let (train, val) = linear_dataset().split_at(24);
        let (mut train, val) = (train.unwrap(), val.unwrap());
        let size = net.arch().size();
        let mut trainer = Trainer::new(
            Adam::new(size, 0.01, 0.9, 0.999, 1e-7),
            Mse,
            200,
            NonZeroUsize::new(8).unwrap(),
            StdRng::seed_from_u64(2),
        );

        let mut seen = 0;
        let (arch, params) = net.parts_mut();
        let history = trainer
            .train(arch, params, &mut train, Some(&val), |_| seen += 1)
            .unwrap();

        assert_eq!(seen, 200);
        assert!(history[199].loss < history[0].loss);
        assert!(history[199].val_loss.unwrap() < history[0].val_loss.unwrap());
    }
}
