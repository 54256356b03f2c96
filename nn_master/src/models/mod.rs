mod dense_regressor;

pub use dense_regressor::DenseRegressor;
