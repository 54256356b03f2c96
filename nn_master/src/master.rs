use std::{
    env,
    path::{Path, PathBuf},
};

use ndarray::{ArrayD, ArrayViewD};
use neural_net::Network;

use crate::{
    Result,
    config::{MasterConfig, Task},
    history::HistoryLogger,
    jacobian, persist,
    normalizer::NormStats,
    shape::Shape,
};

/// The state every neural network model carries through its lifecycle: identity, environment,
/// hyperparameters, inferred shapes, split counts and normalization statistics.
#[derive(Debug, Clone)]
pub struct Master {
    pub name: Option<String>,
    pub model_type: Option<String>,
    identifier: String,
    pub implementation_version: Option<String>,
    platform: String,
    crate_version: &'static str,
    engine_version: &'static str,
    pub current_dir: PathBuf,
    pub folder_name: Option<String>,
    pub(crate) full_file_path: Option<PathBuf>,
    pub batch_size: usize,
    pub autosave: bool,

    // Hyperparameters
    pub task: Option<Task>,
    pub lr: Option<f32>,
    pub max_epochs: Option<usize>,
    pub val_size: Option<f64>,
    pub(crate) val_num: Option<usize>,

    // Optimizer parameters
    pub beta_1: f32,
    pub beta_2: f32,
    pub optimizer_epsilon: f32,
    pub optimizer: Option<String>,

    pub verbose: u8,
    pub seed: Option<u64>,

    pub input_norm: Option<NormStats>,
    pub labels_norm: Option<NormStats>,

    pub(crate) input_shape: Option<Shape>,
    pub(crate) labels_shape: Option<Shape>,

    pub(crate) num_train: Option<usize>,
    pub target_name: Option<Vec<String>>,
    pub history: HistoryLogger,
}

impl Master {
    /// Creates a new `Master` rooted at the current working directory.
    ///
    /// # Arguments
    /// * `identifier` - The name of the concrete model type.
    pub fn new(identifier: impl Into<String>) -> Result<Self> {
        let current_dir = env::current_dir()?;
        Ok(Self::with_dir(identifier, current_dir))
    }

    /// Creates a new `Master` whose run folders are created under `current_dir`.
    pub fn with_dir(identifier: impl Into<String>, current_dir: impl Into<PathBuf>) -> Self {
        let defaults = MasterConfig::default();

        Self {
            name: None,
            model_type: None,
            identifier: identifier.into(),
            implementation_version: None,
            platform: format!("{} {}", env::consts::OS, env::consts::ARCH),
            crate_version: env!("CARGO_PKG_VERSION"),
            engine_version: neural_net::VERSION,
            current_dir: current_dir.into(),
            folder_name: None,
            full_file_path: None,
            batch_size: defaults.batch_size,
            autosave: defaults.autosave,
            task: None,
            lr: None,
            max_epochs: None,
            val_size: None,
            val_num: None,
            beta_1: defaults.beta_1,
            beta_2: defaults.beta_2,
            optimizer_epsilon: defaults.optimizer_epsilon,
            optimizer: None,
            verbose: defaults.verbose,
            seed: None,
            input_norm: None,
            labels_norm: None,
            input_shape: None,
            labels_shape: None,
            num_train: None,
            target_name: None,
            history: HistoryLogger::new(),
        }
    }

    /// Builder flavor of [`Master::apply_config`].
    pub fn with_config(mut self, config: &MasterConfig) -> Self {
        self.apply_config(config);
        self
    }

    /// Takes every hyperparameter from `config`.
    pub fn apply_config(&mut self, config: &MasterConfig) {
        self.task = Some(config.task);
        self.batch_size = config.batch_size;
        self.lr = Some(config.lr);
        self.max_epochs = Some(config.max_epochs);
        self.val_size = Some(config.val_size);
        self.beta_1 = config.beta_1;
        self.beta_2 = config.beta_2;
        self.optimizer_epsilon = config.optimizer_epsilon;
        self.verbose = config.verbose;
        self.autosave = config.autosave;
        self.seed = config.seed;
        if config.folder_name.is_some() {
            self.folder_name = config.folder_name.clone();
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn crate_version(&self) -> &str {
        self.crate_version
    }

    pub fn engine_version(&self) -> &str {
        self.engine_version
    }

    /// The run folder of the last `save`, if any.
    pub fn full_file_path(&self) -> Option<&Path> {
        self.full_file_path.as_deref()
    }

    pub fn input_shape(&self) -> Option<&Shape> {
        self.input_shape.as_ref()
    }

    pub fn labels_shape(&self) -> Option<&Shape> {
        self.labels_shape.as_ref()
    }

    pub fn num_train(&self) -> Option<usize> {
        self.num_train
    }

    pub fn val_num(&self) -> Option<usize> {
        self.val_num
    }

    /// Forgets the inferred shapes so the next pre-training checklist infers them again.
    pub fn reset_shapes(&mut self) {
        self.input_shape = None;
        self.labels_shape = None;
    }
}

/// A neural network model.
///
/// Concrete models own a [`Master`] and provide the architecture, training and testing; the
/// lifecycle operations shared by every model (checklists, persistence and the jacobian) are
/// provided on top of them.
pub trait NeuralNetMaster {
    fn master(&self) -> &Master;

    fn master_mut(&mut self) -> &mut Master;

    /// Trains the model on `input_data` and `labels`, the first axis of both being the samples.
    fn train(&mut self, input_data: ArrayViewD<f32>, labels: ArrayViewD<f32>) -> Result<()>;

    /// Predicts the labels of `input_data`.
    fn test(&self, input_data: ArrayViewD<f32>) -> Result<ArrayD<f32>>;

    /// Builds a new untrained network for the shapes inferred by the pre-training checklist.
    fn model(&self) -> Result<Network>;

    /// Saves whatever the concrete model needs into the run folder, called by `save`.
    fn post_training_checklist_child(&mut self) -> Result<()>;

    /// The network used for training, once there is one.
    fn network(&self) -> Option<&Network>;

    /// A network dedicated to prediction, preferred over `network` when computing gradients.
    fn predict_network(&self) -> Option<&Network> {
        None
    }

    /// Derives the training/validation split and infers the data shapes, see
    /// [`Master::pre_training_checklist`].
    fn pre_training_checklist_master(
        &mut self,
        input_data: ArrayViewD<f32>,
        labels: ArrayViewD<f32>,
    ) -> Result<()> {
        self.master_mut().pre_training_checklist(input_data, labels)
    }

    fn pre_testing_checklist_master(&self) -> Result<()> {
        Ok(())
    }

    fn post_training_checklist_master(&mut self) -> Result<()> {
        Ok(())
    }

    /// Saves the run: hyperparameters, optional diagram, the model's own artifacts and the
    /// training history.
    ///
    /// # Arguments
    /// * `name` - The run folder name, a numbered one is generated when neither this nor the
    ///   master's `folder_name` are set.
    /// * `model_plot` - Whether to draw the network's architecture.
    ///
    /// # Returns
    /// The run folder.
    fn save(&mut self, name: Option<&str>, model_plot: bool) -> Result<PathBuf> {
        persist::save(self, name, model_plot)
    }

    /// Draws the network's architecture into the run folder, best effort.
    fn plot_model(&self) -> Result<()> {
        persist::plot_model(self.master(), self.network())
    }

    /// Computes the gradient of every output unit with respect to every input feature, for
    /// every sample of `x`.
    ///
    /// # Arguments
    /// * `x` - The raw (not normalized) input data.
    /// * `mean_output` - Whether to average the result over the samples.
    ///
    /// # Returns
    /// An array shaped `(units, features, samples)` for sequence networks or
    /// `(units, d1, d2, d3, samples)` for image networks, without the last axis when
    /// `mean_output` is set.
    fn jacobian(&self, x: Option<ArrayViewD<f32>>, mean_output: bool) -> Result<ArrayD<f32>> {
        let Some(x) = x else {
            return Err(crate::MasterErr::MissingInput);
        };

        let network = self.predict_network().or_else(|| self.network());
        jacobian::jacobian(self.master(), network, x, mean_output)
    }
}
