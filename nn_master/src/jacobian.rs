use std::time::Instant;

use log::{debug, info};
use ndarray::{Array2, Array3, Array4, Array5, ArrayD, ArrayView1, ArrayViewD, Axis, s};
use neural_net::{Network, Tape};
use rayon::prelude::*;

use crate::{Master, MasterErr, Result};

/// The gradients of every output unit with respect to a flattened input sample.
///
/// A batch repeating the sample once per unit is propagated forward and then backward seeded
/// with the identity, so row `j` of the result holds the gradient of unit `j`.
struct GradientGraph<'a> {
    network: &'a Network,
    seed: Array2<f32>,
}

impl<'a> GradientGraph<'a> {
    fn new(network: &'a Network, units: usize) -> Self {
        Self {
            network,
            seed: Array2::eye(units),
        }
    }

    fn units(&self) -> usize {
        self.seed.nrows()
    }

    fn eval(&self, sample: ArrayView1<f32>, tape: &mut Tape) -> Result<Array2<f32>> {
        let batch = sample
            .broadcast((self.units(), sample.len()))
            .ok_or_else(|| MasterErr::shape_mismatch("sample can't be repeated per unit"))?;

        Ok(self.network.input_gradients(batch, self.seed.view(), tape)?)
    }
}

pub(crate) fn jacobian(
    master: &Master,
    network: Option<&Network>,
    x: ArrayViewD<f32>,
    mean_output: bool,
) -> Result<ArrayD<f32>> {
    if x.is_empty() {
        return Err(MasterErr::InvalidInput("can't compute the jacobian of zero samples"));
    }

    let input_norm = master
        .input_norm
        .as_ref()
        .ok_or(MasterErr::NotTrained("input normalization statistics"))?;
    let network = network.ok_or(MasterErr::NotTrained("network"))?;

    let expected = network.layer("input")?.input_shape();
    let units = network.layer("output")?.units();
    if let Some(labels_shape) = master.labels_shape()
        && labels_shape.size() != units
    {
        return Err(MasterErr::shape_mismatch(format!(
            "the output layer has {units} units but the labels have shape {labels_shape}"
        )));
    }

    let x = match expected.len() {
        3 if x.ndim() == 3 => input_norm.channel(0)?.normalize(x)?,
        _ => input_norm.normalize(x)?,
    };

    debug!(
        "{} worker threads available for gradient computation",
        rayon::current_num_threads()
    );

    let start = Instant::now();
    let graph = GradientGraph::new(network, units);

    let jacobian = match *expected.as_slice() {
        [features, channels] => sequence_jacobian(&graph, x.view(), features, channels)?,
        [d1, d2, d3] => image_jacobian(&graph, x.view(), (d1, d2, d3))?,
        _ => {
            return Err(MasterErr::shape_mismatch(format!(
                "the input layer takes {} dimensional data",
                expected.len() + 1
            )));
        }
    };

    let jacobian = if mean_output {
        let last = Axis(jacobian.ndim() - 1);
        jacobian
            .mean_axis(last)
            .ok_or(MasterErr::InvalidInput("can't average zero samples"))?
    } else {
        jacobian
    };

    info!(
        "Finished gradient calculation, {:.2} seconds elapsed",
        start.elapsed().as_secs_f64()
    );

    Ok(jacobian)
}

/// `(units, features, samples)`, for networks taking `(features, channels)` samples.
fn sequence_jacobian(
    graph: &GradientGraph,
    x: ArrayViewD<f32>,
    features: usize,
    channels: usize,
) -> Result<ArrayD<f32>> {
    if channels != 1 {
        return Err(MasterErr::shape_mismatch(format!(
            "the input layer takes {channels} channels, only 1 can be squeezed"
        )));
    }

    let shape = x.shape().to_vec();
    let mismatch = || {
        MasterErr::shape_mismatch(format!(
            "got {shape:?}, expected ({features}, {channels}) samples"
        ))
    };

    let samples = match *shape.as_slice() {
        [n] if features == 1 => n,
        [n] if n == features => 1,
        [rows, f] if f == features => rows,
        [rows, f, c] if f == features && c == channels => rows,
        _ => return Err(mismatch()),
    };
    let data = x.to_shape((samples, features)).map_err(|_| mismatch())?;

    debug!("computing a jacobian of {} units over {samples} samples", graph.units());

    let mut jacobian = Array3::<f32>::ones((graph.units(), features, samples));

    jacobian
        .axis_iter_mut(Axis(2))
        .into_par_iter()
        .zip(data.axis_iter(Axis(0)).into_par_iter())
        .try_for_each_init(Tape::new, |tape, (mut slot, sample)| {
            let grad = graph.eval(sample, tape)?;
            slot.assign(&grad);
            Ok::<_, MasterErr>(())
        })?;

    Ok(jacobian.into_dyn())
}

/// `(units, d1, d2, d3, samples)`, for networks taking `(d1, d2, d3)` samples. Data without the
/// channel axis is fed through channel 0 and only fills that channel slot.
fn image_jacobian(
    graph: &GradientGraph,
    x: ArrayViewD<f32>,
    (d1, d2, d3): (usize, usize, usize),
) -> Result<ArrayD<f32>> {
    let shape = x.shape().to_vec();
    let mismatch = || {
        MasterErr::shape_mismatch(format!("got {shape:?}, expected ({d1}, {d2}, {d3}) samples"))
    };

    let (samples, mono) = match *shape.as_slice() {
        [rows, a, b] if (a, b) == (d1, d2) => (rows, true),
        [rows, a, b, c] if (a, b, c) == (d1, d2, d3) => (rows, false),
        _ => return Err(mismatch()),
    };
    let channels = if mono { 1 } else { d3 };
    let data = x
        .to_shape((samples, d1, d2, channels))
        .map_err(|_| mismatch())?;

    debug!(
        "computing a jacobian of {} units over {samples} samples, mono: {mono}",
        graph.units()
    );

    let mut jacobian = Array5::<f32>::ones((graph.units(), d1, d2, d3, samples));

    jacobian
        .axis_iter_mut(Axis(4))
        .into_par_iter()
        .zip(data.axis_iter(Axis(0)).into_par_iter())
        .try_for_each_init(Tape::new, |tape, (mut slot, sample)| {
            let mut input = Array3::<f32>::zeros((d1, d2, d3));
            if mono {
                input
                    .index_axis_mut(Axis(2), 0)
                    .assign(&sample.index_axis(Axis(2), 0));
            } else {
                input.assign(&sample);
            }

            let input = input
                .into_shape_with_order(d1 * d2 * d3)
                .map_err(|_| mismatch())?;
            let grad: Array4<f32> = graph
                .eval(input.view(), tape)?
                .into_shape_with_order((graph.units(), d1, d2, d3))
                .map_err(|_| mismatch())?;

            if mono {
                slot.slice_mut(s![.., .., .., 0])
                    .assign(&grad.slice(s![.., .., .., 0]));
            } else {
                slot.assign(&grad);
            }

            Ok::<_, MasterErr>(())
        })?;

    Ok(jacobian.into_dyn())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::NormStats;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array, ArrayD, IxDyn, array};
    use neural_net::{Sequential, arch::layers::Layer};

    fn linear(input_shape: Vec<usize>, weights: Vec<f32>, units: usize) -> Network {
        let features = input_shape.iter().product();
        let arch = Sequential::new([
            Layer::input("input", input_shape),
            Layer::dense("output", (features, units), None),
        ])
        .unwrap();

        let mut params = weights;
        params.extend(std::iter::repeat_n(0.5, units));
        Network::new(arch, params).unwrap()
    }

    fn master(mean: f32, std: f32) -> Master {
        let mut master = Master::with_dir("Stub", ".");
        master.input_norm = Some(NormStats::new(
            ndarray::arr0(mean).into_dyn(),
            ndarray::arr0(std).into_dyn(),
        ));
        master
    }

    #[test]
    fn linear_network_gradients_are_its_weights() {
        // Dense weights are laid out (in, out), row major.
        let weights = vec![1., 2., 3., 4., 5., 6.];
        let net = linear(vec![3, 1], weights, 2);
        let x = Array::linspace(-1., 1., 12).into_shape_with_order((4, 3)).unwrap();

        let j = jacobian(&master(0.3, 2.), Some(&net), x.into_dyn().view(), false).unwrap();
        assert_eq!(j.shape(), &[2, 3, 4]);

        // Gradients are taken with respect to the normalized input, whatever the statistics.
        let expected = array![[1_f32, 3., 5.], [2., 4., 6.]];
        for i in 0..4 {
            let slice = j.index_axis(Axis(2), i);
            for (got, want) in slice.iter().zip(expected.iter()) {
                assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn single_sample_sequences_are_accepted() {
        let net = linear(vec![3, 1], vec![0.1; 6], 2);
        let x = array![1_f32, 2., 3.];

        let j = jacobian(&master(0., 1.), Some(&net), x.into_dyn().view(), false).unwrap();
        assert_eq!(j.shape(), &[2, 3, 1]);
    }

    #[test]
    fn multi_channel_sequences_are_rejected() {
        let net = linear(vec![3, 2], vec![0.1; 12], 2);
        let x = ArrayD::<f32>::zeros(IxDyn(&[4, 3, 2]));

        let err = jacobian(&master(0., 1.), Some(&net), x.view(), false);
        assert!(matches!(err, Err(MasterErr::ShapeMismatch(_))));
    }

    #[test]
    fn wrong_feature_count_is_rejected() {
        let net = linear(vec![3, 1], vec![0.1; 6], 2);
        let x = ArrayD::<f32>::zeros(IxDyn(&[4, 5]));

        let err = jacobian(&master(0., 1.), Some(&net), x.view(), false);
        assert!(matches!(err, Err(MasterErr::ShapeMismatch(_))));
    }

    #[test]
    fn mono_images_only_fill_the_first_channel() {
        let (d1, d2, d3) = (2, 2, 3);
        let net = linear(vec![d1, d2, d3], (0..24).map(|v| v as f32).collect(), 2);
        let x = ArrayD::<f32>::from_elem(IxDyn(&[5, d1, d2]), 0.25);

        let j = jacobian(&master(0., 1.), Some(&net), x.view(), false).unwrap();
        assert_eq!(j.shape(), &[2, d1, d2, d3, 5]);

        for c in 1..d3 {
            assert!(j.slice(s![.., .., .., c, ..]).iter().all(|&v| v == 1.));
        }
        // (row 0, col 1, channel 0) is flat input 3, its weight for unit 1 is 3 * 2 + 1.
        assert_eq!(j[[1, 0, 1, 0, 4]], 7.);
    }

    #[test]
    fn missing_statistics_mean_not_trained() {
        let net = linear(vec![3, 1], vec![0.1; 6], 2);
        let x = ArrayD::<f32>::zeros(IxDyn(&[4, 3]));
        let master = Master::with_dir("Stub", ".");

        let err = jacobian(&master, Some(&net), x.view(), false);
        assert!(matches!(err, Err(MasterErr::NotTrained(_))));
    }

    #[test]
    fn empty_input_is_rejected() {
        let net = linear(vec![3, 1], vec![0.1; 6], 2);
        let x = ArrayD::<f32>::zeros(IxDyn(&[0, 3]));

        let err = jacobian(&master(0., 1.), Some(&net), x.view(), false);
        assert!(matches!(err, Err(MasterErr::InvalidInput(_))));
    }
}
