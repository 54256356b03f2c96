use std::{env, error::Error};

use log::info;
use ndarray::{Array1, Array2, Axis};
use nn_master::{DenseRegressor, MasterConfig, NeuralNetMaster};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => MasterConfig::from_json_file(path)?,
        None => MasterConfig {
            seed: Some(42),
            ..MasterConfig::default()
        },
    };

    let x = Array2::from_shape_fn((512, 4), |(i, j)| ((i * (j + 3) + j) % 17) as f32 / 4.);
    let y: Array1<f32> = x
        .rows()
        .into_iter()
        .map(|r| 1.5 * r[0] - 0.5 * r[1] + r[2] * r[3] / 4. + 2.)
        .collect();

    let mut model = DenseRegressor::new()?.with_config(&config);
    model.train(x.view().into_dyn(), y.view().into_dyn())?;

    let folder = model.save(None, true)?;
    info!("run saved to {}", folder.display());

    let jacobian = model.jacobian(Some(x.view().into_dyn()), true)?;
    for (unit, grads) in jacobian.axis_iter(Axis(0)).enumerate() {
        let grads: Vec<String> = grads.iter().map(|g| format!("{g:.4}")).collect();
        info!("mean gradient of unit {unit}: [{}]", grads.join(", "));
    }

    Ok(())
}
