use std::{fs, path::Path};

use log::debug;
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    Model, Sequential,
    init::init_params,
    layers::Layer,
    spec::{NetworkSpec, ParamInitSpec},
    tape::Tape,
};
use crate::{NnErr, Result};

/// A trained (or trainable) network: its architecture together with its parameters.
#[derive(Clone, Debug)]
pub struct Network {
    arch: Sequential,
    params: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct SavedNetwork {
    spec: NetworkSpec,
    params: Vec<f32>,
}

impl Network {
    /// Creates a new `Network`.
    ///
    /// # Returns
    /// An error if the amount of parameters doesn't match the architecture.
    pub fn new(arch: Sequential, params: Vec<f32>) -> Result<Self> {
        if params.len() != arch.size() {
            return Err(NnErr::SizeMismatch {
                what: "network parameters",
                got: params.len(),
                expected: arch.size(),
            });
        }

        Ok(Self { arch, params })
    }

    /// Creates a new `Network` with freshly initialized parameters.
    pub fn init<R: Rng>(arch: Sequential, init: ParamInitSpec, rng: &mut R) -> Result<Self> {
        let params = init_params(&arch, init, rng)?;
        Self::new(arch, params)
    }

    pub fn arch(&self) -> &Sequential {
        &self.arch
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Splits the network into its architecture and a mutable view of its parameters.
    pub fn parts_mut(&mut self) -> (&Sequential, &mut [f32]) {
        (&self.arch, &mut self.params)
    }

    /// Looks up a layer by its name.
    pub fn get_layer(&self, name: &str) -> Option<&Layer> {
        self.arch.get_layer(name)
    }

    /// Like `get_layer` but failing when the layer doesn't exist.
    pub fn layer(&self, name: &str) -> Result<&Layer> {
        self.get_layer(name)
            .ok_or_else(|| NnErr::UnknownLayer(name.to_string()))
    }

    /// Predicts a batch of flattened samples.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.arch.forward(&self.params, x)
    }

    /// See [`Sequential::input_gradients`].
    pub fn input_gradients(
        &self,
        x: ArrayView2<f32>,
        seed: ArrayView2<f32>,
        tape: &mut Tape,
    ) -> Result<Array2<f32>> {
        self.arch.input_gradients(&self.params, x, seed, tape)
    }

    /// Writes the architecture and the parameters as JSON to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let saved = SavedNetwork {
            spec: self.arch.spec(),
            params: self.params.clone(),
        };

        let path = path.as_ref();
        fs::write(path, serde_json::to_vec(&saved)?)?;
        debug!(path:? = path; "saved network with {} parameters", self.params.len());
        Ok(())
    }

    /// Reads a network written by [`Network::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read(path)?;
        let saved: SavedNetwork = serde_json::from_slice(&content)?;
        Self::new(Sequential::from_spec(&saved.spec)?, saved.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::activations::ActFn;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    fn network() -> Network {
        let arch = Sequential::new([
            Layer::input("input", vec![2]),
            Layer::dense("hidden", (2, 3), Some(ActFn::sigmoid(1.))),
            Layer::dense("output", (3, 1), None),
        ])
        .unwrap();

        Network::init(arch, ParamInitSpec::Kaiming, &mut StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn rejects_wrong_param_count() {
        let arch = network().arch().clone();
        let err = Network::new(arch, vec![0.; 3]);

        assert!(matches!(err, Err(NnErr::SizeMismatch { got: 3, .. })));
    }

    #[test]
    fn save_then_load_predicts_the_same() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_weights.json");

        let net = network();
        net.save(&path).unwrap();
        let loaded = Network::load(&path).unwrap();

        let x = array![[0.5_f32, -1.], [2., 0.25]];
        let (before, after) = (net.predict(x.view()).unwrap(), loaded.predict(x.view()).unwrap());
        for (b, a) in before.iter().zip(after.iter()) {
            approx::assert_abs_diff_eq!(*b, *a, epsilon = 1e-6);
        }
    }

    #[test]
    fn unknown_layer_is_an_error() {
        assert!(matches!(network().layer("nope"), Err(NnErr::UnknownLayer(_))));
    }
}
