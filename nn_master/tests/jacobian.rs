mod common;

use approx::assert_abs_diff_eq;
use common::{Stub, network};
use ndarray::{Array, ArrayD, Axis, IxDyn, s};
use nn_master::{DenseRegressor, MasterConfig, MasterErr, NeuralNetMaster};

fn data(shape: &[usize]) -> ArrayD<f32> {
    let len = shape.iter().product::<usize>();
    Array::from_iter((0..len).map(|i| ((i * 7) % 11) as f32 / 5. - 1.))
        .into_shape_with_order(IxDyn(shape))
        .unwrap()
}

fn trained(input: &ArrayD<f32>, labels: &ArrayD<f32>) -> DenseRegressor {
    let config = MasterConfig {
        max_epochs: 3,
        batch_size: 4,
        verbose: 0,
        seed: Some(5),
        ..MasterConfig::default()
    };

    let mut model = DenseRegressor::with_dir(std::env::temp_dir())
        .with_config(&config)
        .with_hidden(vec![4]);
    model.train(input.view(), labels.view()).unwrap();
    model
}

fn stub(input_shape: Vec<usize>, units: usize) -> Stub {
    Stub::new(&std::env::temp_dir(), network(input_shape, units, 11)).with_norm(0.1, 1.5)
}

#[test]
fn missing_input_fails_before_touching_state() {
    let stub = stub(vec![8, 1], 3);
    let err = stub.jacobian(None, false);

    assert!(matches!(err, Err(MasterErr::MissingInput)));
    assert_eq!(
        err.unwrap_err().to_string(),
        "Please provide data to calculate the jacobian"
    );
    assert!(stub.master.full_file_path().is_none());
    assert!(stub.master.input_shape().is_none());
}

#[test]
fn sequence_shapes() {
    let stub = stub(vec![8, 1], 3);

    for n in [1, 5, 50] {
        let j = stub.jacobian(Some(data(&[n, 8]).view()), false).unwrap();
        assert_eq!(j.shape(), &[3, 8, n]);

        let j = stub.jacobian(Some(data(&[n, 8, 1]).view()), false).unwrap();
        assert_eq!(j.shape(), &[3, 8, n]);

        let j = stub.jacobian(Some(data(&[n, 8]).view()), true).unwrap();
        assert_eq!(j.shape(), &[3, 8]);
    }
}

#[test]
fn image_shapes() {
    let stub = stub(vec![4, 5, 2], 3);

    for n in [1, 5, 50] {
        let j = stub.jacobian(Some(data(&[n, 4, 5, 2]).view()), false).unwrap();
        assert_eq!(j.shape(), &[3, 4, 5, 2, n]);

        let j = stub.jacobian(Some(data(&[n, 4, 5, 2]).view()), true).unwrap();
        assert_eq!(j.shape(), &[3, 4, 5, 2]);
    }
}

#[test]
fn mean_output_is_the_mean_over_samples() {
    for (stub, shape) in [
        (stub(vec![8, 1], 3), vec![5, 8]),
        (stub(vec![4, 5, 2], 2), vec![5, 4, 5, 2]),
    ] {
        let x = data(&shape);
        let full = stub.jacobian(Some(x.view()), false).unwrap();
        let mean = stub.jacobian(Some(x.view()), true).unwrap();

        let last = Axis(full.ndim() - 1);
        let expected = full.mean_axis(last).unwrap();
        assert_eq!(mean.shape(), expected.shape());
        for (got, want) in mean.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
    }
}

#[test]
fn mono_images_only_populate_the_first_channel() {
    let stub = stub(vec![3, 3, 3], 2);
    let j = stub.jacobian(Some(data(&[5, 3, 3]).view()), false).unwrap();

    assert_eq!(j.shape(), &[2, 3, 3, 3, 5]);
    assert!(j.slice(s![.., .., .., 1.., ..]).iter().all(|&v| v == 1.));
    assert!(j.slice(s![.., .., .., 0, ..]).iter().any(|&v| v != 1.));
}

#[test]
fn rank_five_input_is_a_shape_mismatch() {
    for stub in [stub(vec![8, 1], 3), stub(vec![4, 5, 2], 3)] {
        let err = stub.jacobian(Some(data(&[2, 4, 5, 2, 1]).view()), false);
        assert!(matches!(err, Err(MasterErr::ShapeMismatch(_))));
    }
}

#[test]
fn samples_are_evaluated_independently() {
    let stub = stub(vec![8, 1], 3);
    let x = data(&[50, 8]);
    let all = stub.jacobian(Some(x.view()), false).unwrap();

    for i in [0, 17, 49] {
        let one = stub
            .jacobian(Some(x.slice(s![i..i + 1, ..]).into_dyn()), false)
            .unwrap();
        let column = all.slice(s![.., .., i]);

        for (got, want) in one.iter().zip(column.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
    }
}

#[test]
fn matches_finite_differences() {
    let stub = stub(vec![8, 1], 3);
    let x = data(&[1, 8]);
    let j = stub.jacobian(Some(x.view()), false).unwrap();

    let normalized = x.mapv(|v| (v - 0.1) / 1.5).into_shape_with_order((1, 8)).unwrap();
    let h = 1e-2;

    for k in 0..8 {
        let mut plus = normalized.clone();
        plus[[0, k]] += h;
        let mut minus = normalized.clone();
        minus[[0, k]] -= h;

        let up = stub.network.predict(plus.view()).unwrap();
        let down = stub.network.predict(minus.view()).unwrap();

        for unit in 0..3 {
            let numeric = (up[[0, unit]] - down[[0, unit]]) / (2. * h);
            assert_abs_diff_eq!(j[[unit, k, 0]], numeric, epsilon = 1e-3);
        }
    }
}

#[test]
fn output_units_must_match_the_labels() {
    let mut stub = stub(vec![8, 1], 3);
    stub
        .train(data(&[10, 8]).view(), data(&[10, 2]).view())
        .unwrap();

    let err = stub.jacobian(Some(data(&[4, 8]).view()), false);
    assert!(matches!(err, Err(MasterErr::ShapeMismatch(_))));
}

#[test]
fn untrained_models_have_no_statistics() {
    let stub = Stub::new(&std::env::temp_dir(), network(vec![8, 1], 3, 1));
    let err = stub.jacobian(Some(data(&[4, 8]).view()), false);

    assert!(matches!(err, Err(MasterErr::NotTrained(_))));
}

#[test]
fn single_feature_models_read_vectors_as_samples() {
    let x = data(&[20]);
    let model = trained(&x, &data(&[20]));
    assert_eq!(model.master().input_shape().unwrap().dims(), &[1, 1]);

    let j = model.jacobian(Some(x.view()), false).unwrap();
    assert_eq!(j.shape(), &[1, 1, 20]);

    let mean = model.jacobian(Some(x.view()), true).unwrap();
    assert_eq!(mean.shape(), &[1, 1]);
}

#[test]
fn mono_images_use_the_first_channel_statistics() {
    let model = trained(&data(&[10, 2, 2, 3]), &data(&[10]));

    let j = model.jacobian(Some(data(&[4, 2, 2]).view()), false).unwrap();
    assert_eq!(j.shape(), &[1, 2, 2, 3, 4]);
    assert!(j.slice(s![.., .., .., 1.., ..]).iter().all(|&v| v == 1.));
    assert!(j.iter().all(|v| v.is_finite()));
}
