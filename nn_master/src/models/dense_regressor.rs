use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use log::info;
use ndarray::{Array2, ArrayD, ArrayViewD, Axis, IxDyn};
use neural_net::{
    Network, Sequential,
    arch::{
        activations::ActFn,
        layers::Layer,
        loss::Mse,
        spec::{ActFnSpec, ParamInitSpec},
    },
    dataset::Dataset,
    optimization::{Adam, Optimizer},
    training::Trainer,
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Master, MasterErr, NeuralNetMaster, Result,
    config::{MasterConfig, Task},
    normalizer::NormStats,
    shape::Shape,
};

/// The file the network is saved to inside a run folder.
pub const WEIGHTS_FILE: &str = "model_weights.json";
/// The file everything but the network is saved to inside a run folder.
pub const PARAMETER_FILE: &str = "model_parameter.json";

const IDENTIFIER: &str = "DenseRegressor";

#[derive(Serialize, Deserialize)]
struct ModelParameter {
    identifier: String,
    task: Task,
    hidden: Vec<usize>,
    activation: ActFnSpec,
    input_shape: Shape,
    labels_shape: Shape,
    input_norm: NormStats,
    labels_norm: NormStats,
    target_name: Option<Vec<String>>,
}

/// A fully connected network: the flattened input goes through every hidden layer and ends up
/// in one unit per label value.
#[derive(Debug, Clone)]
pub struct DenseRegressor {
    master: Master,
    pub hidden: Vec<usize>,
    pub activation: ActFnSpec,
    pub init: ParamInitSpec,
    network: Option<Network>,
}

impl DenseRegressor {
    /// Creates a new `DenseRegressor` saving its runs under the current working directory.
    pub fn new() -> Result<Self> {
        Ok(Self::from_master(Master::new(IDENTIFIER)?))
    }

    /// Creates a new `DenseRegressor` saving its runs under `dir`.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self::from_master(Master::with_dir(IDENTIFIER, dir))
    }

    fn from_master(mut master: Master) -> Self {
        master.model_type = Some("NN".to_string());
        master.apply_config(&MasterConfig::default());

        Self {
            master,
            hidden: vec![32, 16],
            activation: ActFnSpec::Relu,
            init: ParamInitSpec::default(),
            network: None,
        }
    }

    pub fn with_config(mut self, config: &MasterConfig) -> Self {
        self.master.apply_config(config);
        self
    }

    pub fn with_hidden(mut self, hidden: Vec<usize>) -> Self {
        self.hidden = hidden;
        self
    }

    /// Restores a model saved by [`NeuralNetMaster::save`], ready to `test` or compute jacobians.
    ///
    /// # Arguments
    /// * `folder` - The run folder.
    pub fn load<P: AsRef<Path>>(folder: P) -> Result<Self> {
        let folder = folder.as_ref();
        let content = fs::read(folder.join(PARAMETER_FILE))?;
        let parameter: ModelParameter = serde_json::from_slice(&content)?;

        if parameter.identifier != IDENTIFIER {
            return Err(MasterErr::InvalidInput("the run folder holds a different kind of model"));
        }

        let network = Network::load(folder.join(WEIGHTS_FILE))?;

        let dir = folder.parent().unwrap_or(folder).to_path_buf();
        let mut model = Self::with_dir(dir).with_hidden(parameter.hidden);
        model.activation = parameter.activation;

        let master = &mut model.master;
        master.task = Some(parameter.task);
        master.folder_name = folder.file_name().map(|name| name.to_string_lossy().into_owned());
        master.full_file_path = Some(folder.to_path_buf());
        master.input_shape = Some(parameter.input_shape);
        master.labels_shape = Some(parameter.labels_shape);
        master.input_norm = Some(parameter.input_norm);
        master.labels_norm = Some(parameter.labels_norm);
        master.target_name = parameter.target_name;

        model.network = Some(network);
        info!("loaded {IDENTIFIER} from {}", folder.display());
        Ok(model)
    }

    fn rng(&self) -> StdRng {
        match self.master.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    fn shapes(&self) -> Result<(&Shape, &Shape)> {
        let input_shape = self
            .master
            .input_shape()
            .ok_or(MasterErr::NotTrained("input shape"))?;
        let labels_shape = self
            .master
            .labels_shape()
            .ok_or(MasterErr::NotTrained("labels shape"))?;
        Ok((input_shape, labels_shape))
    }
}

/// Flattens every sample of `data` into a row.
fn flatten(data: ArrayD<f32>, features: usize) -> Result<Array2<f32>> {
    let rows = data.len_of(Axis(0));
    let shape = data.shape().to_vec();

    data.to_shape((rows, features))
        .map(|flat| flat.into_owned())
        .map_err(|_| {
            MasterErr::shape_mismatch(format!("got {shape:?}, expected samples of {features} values"))
        })
}

impl NeuralNetMaster for DenseRegressor {
    fn master(&self) -> &Master {
        &self.master
    }

    fn master_mut(&mut self) -> &mut Master {
        &mut self.master
    }

    fn train(&mut self, input_data: ArrayViewD<f32>, labels: ArrayViewD<f32>) -> Result<()> {
        if input_data.len_of(Axis(0)) != labels.len_of(Axis(0)) {
            return Err(MasterErr::shape_mismatch(format!(
                "{} input samples but {} labels",
                input_data.len_of(Axis(0)),
                labels.len_of(Axis(0))
            )));
        }

        self.pre_training_checklist_master(input_data.view(), labels.view())?;

        let input_norm = NormStats::fit(input_data.view())?;
        let labels_norm = match self.master.task.unwrap_or_default() {
            Task::Regression => NormStats::fit(labels.view())?,
            Task::Classification | Task::BinaryClassification => NormStats::identity(),
        };

        let (input_shape, labels_shape) = self.shapes()?;
        let x = flatten(input_norm.normalize(input_data)?, input_shape.size())?;
        let y = flatten(labels_norm.normalize(labels)?, labels_shape.size())?;

        let num_train = self.master.num_train().unwrap_or(x.nrows());
        let mut rng = self.rng();
        let mut dataset = Dataset::new(x, y)?;
        dataset.shuffle(&mut rng);
        let (train, validation) = dataset.split_at(num_train);
        let mut train = train.ok_or(MasterErr::InvalidInput("no samples left to train on"))?;

        let mut network = self.model()?;
        let (arch, params) = network.parts_mut();

        let master = &mut self.master;
        let lr = master.lr.unwrap_or(MasterConfig::default().lr);
        let max_epochs = master.max_epochs.unwrap_or(MasterConfig::default().max_epochs);
        let batch_size = NonZeroUsize::new(master.batch_size)
            .ok_or_else(|| MasterErr::InvalidConfig("batch_size must be greater than 0".into()))?;

        let optimizer = Adam::new(
            params.len(),
            lr,
            master.beta_1,
            master.beta_2,
            master.optimizer_epsilon,
        );
        master.optimizer = Some(optimizer.name().to_string());

        let mut trainer = Trainer::new(optimizer, Mse::new(), max_epochs, batch_size, rng);

        let verbose = master.verbose;
        let history = &mut master.history;
        history.clear();

        let stats = trainer.train(arch, params, &mut train, validation.as_ref(), |stats| {
            history.record(stats);
            if verbose >= 2 {
                info!(
                    "Epoch {}/{max_epochs}, loss: {:.6}, val_loss: {}",
                    stats.epoch + 1,
                    stats.loss,
                    stats.val_loss.map_or_else(|| "None".to_string(), |l| format!("{l:.6}"))
                );
            }
        })?;

        if verbose >= 1
            && let Some(last) = stats.last()
        {
            info!(
                "Completed training {IDENTIFIER} for {} epochs, final loss: {:.6}",
                stats.len(),
                last.loss
            );
        }

        master.input_norm = Some(input_norm);
        master.labels_norm = Some(labels_norm);
        self.network = Some(network);

        self.post_training_checklist_master()?;

        if self.master.autosave {
            self.save(None, false)?;
        }

        Ok(())
    }

    fn test(&self, input_data: ArrayViewD<f32>) -> Result<ArrayD<f32>> {
        self.pre_testing_checklist_master()?;

        let network = self.network.as_ref().ok_or(MasterErr::NotTrained("network"))?;
        let input_norm = self
            .master
            .input_norm
            .as_ref()
            .ok_or(MasterErr::NotTrained("input normalization statistics"))?;
        let labels_norm = self
            .master
            .labels_norm
            .as_ref()
            .ok_or(MasterErr::NotTrained("labels normalization statistics"))?;
        let (input_shape, labels_shape) = self.shapes()?;

        if input_data.ndim() == 0 {
            return Err(MasterErr::UnsupportedRank {
                what: "input data",
                rank: 0,
            });
        }

        let rows = input_data.len_of(Axis(0));
        let x = flatten(input_norm.normalize(input_data)?, input_shape.size())?;
        let y = network.predict(x.view())?;

        let mut shape = vec![rows];
        shape.extend_from_slice(labels_shape.dims());
        let y = y
            .into_shape_with_order(IxDyn(&shape))
            .map_err(|_| MasterErr::shape_mismatch("the network output doesn't fit the labels shape"))?;

        labels_norm.denormalize(y.view())
    }

    fn model(&self) -> Result<Network> {
        let (input_shape, labels_shape) = self.shapes()?;

        let mut layers = vec![Layer::input("input", input_shape.dims().to_vec())];
        let mut fan_in = input_shape.size();

        for (i, &units) in self.hidden.iter().enumerate() {
            layers.push(Layer::dense(
                format!("dense_{i}"),
                (fan_in, units),
                Some(ActFn::from(self.activation)),
            ));
            fan_in = units;
        }

        let output_act = match self.master.task.unwrap_or_default() {
            Task::Regression => None,
            Task::Classification | Task::BinaryClassification => Some(ActFn::sigmoid(1.)),
        };
        layers.push(Layer::dense("output", (fan_in, labels_shape.size()), output_act));

        let arch = Sequential::new(layers)?;
        Ok(Network::init(arch, self.init, &mut self.rng())?)
    }

    fn post_training_checklist_child(&mut self) -> Result<()> {
        let network = self.network.as_ref().ok_or(MasterErr::NotTrained("network"))?;
        let folder = self
            .master
            .full_file_path()
            .ok_or(MasterErr::NotTrained("run folder"))?;
        let (input_shape, labels_shape) = self.shapes()?;

        let not_trained = || MasterErr::NotTrained("normalization statistics");
        let parameter = ModelParameter {
            identifier: self.master.identifier().to_string(),
            task: self.master.task.unwrap_or_default(),
            hidden: self.hidden.clone(),
            activation: self.activation,
            input_shape: input_shape.clone(),
            labels_shape: labels_shape.clone(),
            input_norm: self.master.input_norm.clone().ok_or_else(not_trained)?,
            labels_norm: self.master.labels_norm.clone().ok_or_else(not_trained)?,
            target_name: self.master.target_name.clone(),
        };

        network.save(folder.join(WEIGHTS_FILE))?;
        fs::write(folder.join(PARAMETER_FILE), serde_json::to_vec_pretty(&parameter)?)?;
        Ok(())
    }

    fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }
}
