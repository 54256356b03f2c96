use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire neural network module.
pub type Result<T> = std::result::Result<T, NnErr>;

/// The neural network module's error type.
#[derive(Debug)]
pub enum NnErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    LayerDimMismatch {
        layer: usize,
        got: usize,
        expected: usize,
    },
    UnknownLayer(String),
    InvalidArchitecture(String),
    EmptyDataset,
    InvalidDistribution(String),
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for NnErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            NnErr::LayerDimMismatch {
                layer,
                got,
                expected,
            } => write!(
                f,
                "Layer {layer} takes {got} inputs but the previous layer yields {expected}"
            ),
            NnErr::UnknownLayer(name) => write!(f, "There's no layer named '{name}'"),
            NnErr::InvalidArchitecture(msg) => write!(f, "Invalid network architecture: {msg}"),
            NnErr::EmptyDataset => write!(f, "The dataset has no samples"),
            NnErr::InvalidDistribution(msg) => {
                write!(f, "Failed to build the initialization distribution: {msg}")
            }
            NnErr::Io(e) => write!(f, "io error: {e}"),
            NnErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for NnErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NnErr::Io(e) => Some(e),
            NnErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NnErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for NnErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
