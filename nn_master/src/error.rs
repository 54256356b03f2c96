use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use neural_net::NnErr;

/// The result type used across the model lifecycle.
pub type Result<T> = std::result::Result<T, MasterErr>;

/// Lifecycle failures.
#[derive(Debug)]
pub enum MasterErr {
    /// No data was given to an operation that needs it.
    MissingInput,
    /// The data given can't be used, e.g. it has no samples.
    InvalidInput(&'static str),
    /// An array's amount of dimensions has no shape convention.
    UnsupportedRank { what: &'static str, rank: usize },
    /// The data doesn't have the shape the network was built for.
    ShapeMismatch(String),
    InvalidConfig(String),
    /// Something only a trained model has is missing.
    NotTrained(&'static str),
    Network(NnErr),
    Io(io::Error),
    Json(serde_json::Error),
}

impl MasterErr {
    pub(crate) fn shape_mismatch(detail: impl Into<String>) -> Self {
        Self::ShapeMismatch(detail.into())
    }
}

impl Display for MasterErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterErr::MissingInput => write!(f, "Please provide data to calculate the jacobian"),
            MasterErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MasterErr::UnsupportedRank { what, rank } => write!(
                f,
                "{what} has {rank} dimensions, only 1 to 4 dimensional data is supported"
            ),
            MasterErr::ShapeMismatch(detail) => write!(
                f,
                "Input data shape does not match neural network expectation: {detail}"
            ),
            MasterErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            MasterErr::NotTrained(what) => write!(f, "the model has no {what} yet, train it first"),
            MasterErr::Network(e) => write!(f, "network error: {e}"),
            MasterErr::Io(e) => write!(f, "io error: {e}"),
            MasterErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for MasterErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MasterErr::Network(e) => Some(e),
            MasterErr::Io(e) => Some(e),
            MasterErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NnErr> for MasterErr {
    fn from(value: NnErr) -> Self {
        Self::Network(value)
    }
}

impl From<io::Error> for MasterErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for MasterErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
