use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::{Sequential, spec::ParamInitSpec};
use crate::{NnErr, Result};

/// Generates the initial parameters of a network following `spec`.
///
/// Weights are drawn layer by layer from the distribution the spec names (using each layer's
/// fan in and fan out), biases start at zero unless the spec is a constant.
///
/// # Returns
/// The flat parameter vector, or an error if a distribution can't be built from the spec.
pub fn init_params<R: Rng>(arch: &Sequential, spec: ParamInitSpec, rng: &mut R) -> Result<Vec<f32>> {
    let mut params = Vec::with_capacity(arch.layers().iter().map(|l| l.size()).sum());

    for layer in arch.layers() {
        let Some((fan_in, fan_out)) = layer.fan_in_out() else {
            continue;
        };

        let n = fan_in * fan_out;
        match spec {
            ParamInitSpec::Const { value } => {
                params.extend(std::iter::repeat_n(value, n + fan_out));
                continue;
            }
            ParamInitSpec::Uniform { low, high } => {
                sample_into(&mut params, uniform(low, high)?, n, rng)
            }
            ParamInitSpec::XavierUniform => {
                let range = (6. / (fan_in + fan_out) as f32).sqrt();
                sample_into(&mut params, uniform(-range, range)?, n, rng)
            }
            ParamInitSpec::Kaiming => {
                let std_dev = (2. / fan_in as f32).sqrt();
                sample_into(&mut params, normal(std_dev)?, n, rng)
            }
            ParamInitSpec::Lecun => {
                let std_dev = (1. / fan_in as f32).sqrt();
                sample_into(&mut params, normal(std_dev)?, n, rng)
            }
        }

        params.extend(std::iter::repeat_n(0., fan_out));
    }

    Ok(params)
}

fn sample_into<D, R>(params: &mut Vec<f32>, distribution: D, n: usize, rng: &mut R)
where
    D: Distribution<f32>,
    R: Rng,
{
    params.extend((0..n).map(|_| distribution.sample(rng)));
}

fn uniform(low: f32, high: f32) -> Result<Uniform<f32>> {
    Uniform::new(low, high).map_err(|e| NnErr::InvalidDistribution(e.to_string()))
}

fn normal(std_dev: f32) -> Result<Normal<f32>> {
    Normal::new(0., std_dev).map_err(|e| NnErr::InvalidDistribution(e.to_string()))
}
