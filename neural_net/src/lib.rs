pub mod arch;
pub mod dataset;
pub mod error;
pub mod optimization;
pub mod training;

pub use arch::{Network, Sequential, Tape};
pub use error::{NnErr, Result};

/// The version of this engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
