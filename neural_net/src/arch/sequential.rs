use ndarray::{Array2, ArrayView2};

use super::{
    Model,
    layers::Layer,
    loss::LossFn,
    spec::NetworkSpec,
    tape::Tape,
};
use crate::{NnErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The first layer is always an input layer, the rest consume the flattened output of the
/// previous one.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of, starting with its input layer.
    ///
    /// # Returns
    /// A new `Sequential` instance, or an error if the layers don't chain together.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();

        let Some(first) = layers.first() else {
            return Err(NnErr::InvalidArchitecture("a network needs at least one layer".into()));
        };

        if !first.is_input() {
            return Err(NnErr::InvalidArchitecture(format!(
                "the first layer '{}' is not an input layer",
                first.name()
            )));
        }

        for (i, pair) in layers.windows(2).enumerate() {
            if pair[1].is_input() {
                return Err(NnErr::InvalidArchitecture(format!(
                    "layer '{}' is an input layer past the first position",
                    pair[1].name()
                )));
            }

            let got: usize = pair[1].input_shape().iter().product();
            let expected = pair[0].units();
            if got != expected {
                return Err(NnErr::LayerDimMismatch {
                    layer: i + 1,
                    got,
                    expected,
                });
            }
        }

        for (i, layer) in layers.iter().enumerate() {
            if layers[..i].iter().any(|l| l.name() == layer.name()) {
                return Err(NnErr::InvalidArchitecture(format!(
                    "the layer name '{}' is used more than once",
                    layer.name()
                )));
            }
        }

        Ok(Self { layers })
    }

    /// Builds a `Sequential` following a spec.
    pub fn from_spec(spec: &NetworkSpec) -> Result<Self> {
        Self::new(spec.layers.iter().map(Layer::from))
    }

    /// Returns the spec this network can be rebuilt from.
    pub fn spec(&self) -> NetworkSpec {
        NetworkSpec {
            layers: self.layers.iter().map(Layer::spec).collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Looks up a layer by its name.
    pub fn get_layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    /// The input layer.
    pub fn input(&self) -> &Layer {
        &self.layers[0]
    }

    /// The last layer.
    pub fn output(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    /// Makes a forward pass through the network, recording what's needed to run backwards.
    ///
    /// # Arguments
    /// * `params` - The whole network's parameters.
    /// * `x` - The input data, one flattened sample per row.
    /// * `tape` - The execution context of this pass.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward_traced(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        tape: &mut Tape,
    ) -> Result<Array2<f32>> {
        self.check_params(params)?;
        tape.prepare(self.layers.len());

        let mut offset = 0;
        let mut a = x.to_owned();

        for (i, layer) in self.layers.iter().enumerate() {
            let size = layer.size();
            a = layer.forward(&params[offset..offset + size], a.view(), tape.trace_mut(i))?;
            offset += size;
        }

        Ok(a)
    }

    /// Makes a backward pass through the network, the last `forward_traced` call on `tape` must
    /// have been made with the same `params`.
    ///
    /// # Arguments
    /// * `params` - The whole network's parameters.
    /// * `grad` - Where to write the parameters' gradient, `None` to skip it.
    /// * `d` - The derivative of the objective with respect to the network's output.
    /// * `tape` - The execution context of the forward pass.
    ///
    /// # Returns
    /// The derivative of the objective with respect to the network's input.
    pub fn backward(
        &self,
        params: &[f32],
        mut grad: Option<&mut [f32]>,
        mut d: Array2<f32>,
        tape: &Tape,
    ) -> Result<Array2<f32>> {
        self.check_params(params)?;
        if let Some(grad) = &grad {
            self.check_len("gradient", grad.len())?;
        }

        if tape.len() != self.layers.len() {
            return Err(NnErr::SizeMismatch {
                what: "tape traces",
                got: tape.len(),
                expected: self.layers.len(),
            });
        }

        let mut end = params.len();

        for (i, layer) in self.layers.iter().enumerate().rev() {
            let start = end - layer.size();
            let layer_grad = grad.as_mut().map(|g| &mut g[start..end]);
            d = layer.backward(&params[start..end], layer_grad, d, tape.trace(i))?;
            end = start;
        }

        Ok(d)
    }

    /// Computes the derivative of `seed · output` with respect to the input, for every row of
    /// the batch. Seeding with the rows of an identity matrix over a batch that repeats a single
    /// sample yields the network's jacobian at that sample.
    pub fn input_gradients(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        seed: ArrayView2<f32>,
        tape: &mut Tape,
    ) -> Result<Array2<f32>> {
        let y = self.forward_traced(params, x, tape)?;

        if y.dim() != seed.dim() {
            return Err(NnErr::SizeMismatch {
                what: "gradient seed",
                got: seed.len(),
                expected: y.len(),
            });
        }

        self.backward(params, None, seed.to_owned(), tape)
    }

    fn check_params(&self, params: &[f32]) -> Result<()> {
        self.check_len("parameters", params.len())
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.size();
        if got != expected {
            return Err(NnErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.forward_traced(params, x, &mut Tape::new())
    }

    // NOTE: since getting the actual loss would require forwarding over all batches again at
    // the end of the backprop iterations, we are approximating it by averaging the loss at
    // each batch.
    fn backprop<'a, L, O, I>(
        &self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        batches: I,
    ) -> Result<f32>
    where
        L: LossFn,
        O: Optimizer,
        I: Iterator<Item = (ArrayView2<'a, f32>, ArrayView2<'a, f32>)>,
    {
        let mut tape = Tape::new();
        let mut total_loss = 0.0;
        let mut num_batches = 0;

        for (x, y) in batches {
            let y_pred = self.forward_traced(params, x, &mut tape)?;
            total_loss += loss_fn.loss(y_pred.view(), y);
            num_batches += 1;

            let d = loss_fn.loss_prime(y_pred.view(), y);
            self.backward(params, Some(&mut *grad), d, &tape)?;
            optimizer.update_params(params, grad)?;
        }

        if num_batches == 0 {
            return Err(NnErr::EmptyDataset);
        }

        Ok(total_loss / num_batches as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::activations::ActFn;
    use ndarray::{Axis, array};

    fn net() -> Sequential {
        Sequential::new([
            Layer::input("input", vec![3, 1]),
            Layer::dense("hidden", (3, 4), Some(ActFn::tanh())),
            Layer::dense("output", (4, 2), None),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_unchained_layers() {
        let err = Sequential::new([
            Layer::input("input", vec![3]),
            Layer::dense("output", (2, 1), None),
        ]);

        assert!(matches!(
            err,
            Err(NnErr::LayerDimMismatch {
                layer: 1,
                got: 2,
                expected: 3
            })
        ));
    }

    #[test]
    fn rejects_missing_input_layer() {
        let err = Sequential::new([Layer::dense("output", (2, 1), None)]);
        assert!(matches!(err, Err(NnErr::InvalidArchitecture(_))));
    }

    #[test]
    fn rejects_duplicated_names() {
        let err = Sequential::new([
            Layer::input("input", vec![2]),
            Layer::dense("dense", (2, 2), None),
            Layer::dense("dense", (2, 1), None),
        ]);
        assert!(matches!(err, Err(NnErr::InvalidArchitecture(_))));
    }

    #[test]
    fn finds_layers_by_name() {
        let net = net();

        assert_eq!(net.get_layer("input").unwrap().input_shape(), vec![3, 1]);
        assert_eq!(net.get_layer("output").unwrap().units(), 2);
        assert!(net.get_layer("missing").is_none());
    }

    #[test]
    fn spec_round_trip_keeps_the_architecture() {
        let net = net();
        let rebuilt = Sequential::from_spec(&net.spec()).unwrap();

        assert_eq!(rebuilt.spec(), net.spec());
        assert_eq!(rebuilt.size(), 3 * 4 + 4 + 4 * 2 + 2);
    }

    #[test]
    fn identity_seed_yields_one_gradient_row_per_output() {
        let net = net();
        let params: Vec<f32> = (0..net.size()).map(|i| ((i % 7) as f32 - 3.) / 10.).collect();
        let sample = array![[0.2_f32, -0.4, 0.6]];
        let batch = sample.broadcast((2, 3)).unwrap().to_owned();
        let seed = Array2::<f32>::eye(2);

        let jac = net
            .input_gradients(&params, batch.view(), seed.view(), &mut Tape::new())
            .unwrap();

        let h = 1e-3;
        for j in 0..2 {
            for i in 0..3 {
                let mut xp = sample.clone();
                let mut xm = sample.clone();
                xp[[0, i]] += h;
                xm[[0, i]] -= h;
                let yp = net.forward(&params, xp.view()).unwrap();
                let ym = net.forward(&params, xm.view()).unwrap();
                let numeric = (yp[[0, j]] - ym[[0, j]]) / (2. * h);
                assert!((jac[[j, i]] - numeric).abs() < 1e-3);
            }
        }

        assert_eq!(jac.len_of(Axis(0)), 2);
    }
}
