mod checklist;
pub mod config;
mod error;
pub mod history;
mod jacobian;
mod master;
pub mod metrics;
pub mod models;
pub mod normalizer;
mod persist;
pub mod shape;

pub use checklist::{infer_input_shape, infer_labels_shape};
pub use config::{MasterConfig, Task};
pub use error::{MasterErr, Result};
pub use history::HistoryLogger;
pub use master::{Master, NeuralNetMaster};
pub use models::DenseRegressor;
pub use normalizer::NormStats;
pub use persist::{HYPERPARAMETER_FILE, folder_runnum, hyperparameter_record, model_dot};
pub use shape::Shape;
