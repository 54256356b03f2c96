mod trainer;

pub use trainer::{EpochStats, Trainer};
