use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{MasterErr, Result};

/// What a model is trained to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    #[default]
    Regression,
    Classification,
    BinaryClassification,
}

/// The tunable knobs of a model, every one of them optional in the JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub task: Task,
    pub batch_size: usize,
    pub lr: f32,
    pub max_epochs: usize,
    pub val_size: f64,
    pub beta_1: f32,
    pub beta_2: f32,
    pub optimizer_epsilon: f32,
    pub verbose: u8,
    pub autosave: bool,
    pub folder_name: Option<String>,
    pub seed: Option<u64>,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            task: Task::Regression,
            batch_size: 64,
            lr: 0.005,
            max_epochs: 50,
            val_size: 0.1,
            beta_1: 0.9,
            beta_2: 0.999,
            optimizer_epsilon: neural_net::arch::loss::EPSILON,
            verbose: 2,
            autosave: false,
            folder_name: None,
            seed: None,
        }
    }
}

impl MasterConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Checks the values are usable for training.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(MasterErr::InvalidConfig("batch_size must be greater than 0".into()));
        }

        if !(0. ..1.).contains(&self.val_size) {
            return Err(MasterErr::InvalidConfig(format!(
                "val_size ({}) must be in [0, 1)",
                self.val_size
            )));
        }

        if !(self.lr > 0.) {
            return Err(MasterErr::InvalidConfig(format!(
                "lr ({}) must be positive",
                self.lr
            )));
        }

        for (name, beta) in [("beta_1", self.beta_1), ("beta_2", self.beta_2)] {
            if !(0. ..1.).contains(&beta) {
                return Err(MasterErr::InvalidConfig(format!(
                    "{name} ({beta}) must be in [0, 1)"
                )));
            }
        }

        Ok(())
    }
}
