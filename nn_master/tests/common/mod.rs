#![allow(dead_code)]

use std::path::Path;

use ndarray::{ArrayD, ArrayViewD};
use neural_net::{
    Network, Sequential,
    arch::{activations::ActFn, layers::Layer, spec::ParamInitSpec},
};
use nn_master::{Master, NeuralNetMaster, NormStats, Result};
use rand::{SeedableRng, rngs::StdRng};

/// A model around a fixed network, training only runs the checklist.
pub struct Stub {
    pub master: Master,
    pub network: Network,
    pub child_calls: usize,
}

impl Stub {
    pub fn new(dir: &Path, network: Network) -> Self {
        Self {
            master: Master::with_dir("Stub", dir),
            network,
            child_calls: 0,
        }
    }

    /// Normalizes with `(x - mean) / std` for scalar statistics.
    pub fn with_norm(mut self, mean: f32, std: f32) -> Self {
        self.master.input_norm = Some(NormStats::new(
            ndarray::arr0(mean).into_dyn(),
            ndarray::arr0(std).into_dyn(),
        ));
        self
    }
}

impl NeuralNetMaster for Stub {
    fn master(&self) -> &Master {
        &self.master
    }

    fn master_mut(&mut self) -> &mut Master {
        &mut self.master
    }

    fn train(&mut self, input_data: ArrayViewD<f32>, labels: ArrayViewD<f32>) -> Result<()> {
        self.pre_training_checklist_master(input_data, labels)
    }

    fn test(&self, input_data: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        Ok(input_data.to_owned())
    }

    fn model(&self) -> Result<Network> {
        Ok(self.network.clone())
    }

    fn post_training_checklist_child(&mut self) -> Result<()> {
        self.child_calls += 1;
        Ok(())
    }

    fn network(&self) -> Option<&Network> {
        Some(&self.network)
    }
}

/// A network taking samples of `input_shape` through a sigmoid hidden layer into `units` outputs.
pub fn network(input_shape: Vec<usize>, units: usize, seed: u64) -> Network {
    let features = input_shape.iter().product();
    let arch = Sequential::new([
        Layer::input("input", input_shape),
        Layer::dense("hidden", (features, 6), Some(ActFn::sigmoid(1.))),
        Layer::dense("output", (6, units), Some(ActFn::tanh())),
    ])
    .unwrap();

    let init = ParamInitSpec::Uniform {
        low: -1.,
        high: 1.,
    };
    Network::init(arch, init, &mut StdRng::seed_from_u64(seed)).unwrap()
}
