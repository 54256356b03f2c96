mod functions;
mod loss_fn;
mod mae;
mod mse;

pub use functions::{
    binary_accuracy, categorical_accuracy, mean_absolute_error, mean_absolute_percentage_error,
    mean_squared_error, mean_squared_logarithmic_error,
};
pub use loss_fn::LossFn;
pub use mae::Mae;
pub use mse::Mse;

/// The fuzz factor used to keep divisions and logarithms finite.
pub const EPSILON: f32 = 1e-7;
