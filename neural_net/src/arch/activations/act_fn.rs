use super::{Relu, Sigmoid, Tanh};
use crate::arch::spec::ActFnSpec;

/// An element-wise activation function applied after a layer's affine transformation.
#[derive(Clone, Debug)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Relu(Relu),
    Tanh(Tanh),
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(Sigmoid::new(amp))
    }

    pub fn relu() -> Self {
        Self::Relu(Relu)
    }

    pub fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    /// Evaluates the activation at `z`.
    pub fn f(&self, z: f32) -> f32 {
        match self {
            Self::Sigmoid(a) => a.f(z),
            Self::Relu(a) => a.f(z),
            Self::Tanh(a) => a.f(z),
        }
    }

    /// Evaluates the derivative of the activation at `z`.
    pub fn df(&self, z: f32) -> f32 {
        match self {
            Self::Sigmoid(a) => a.df(z),
            Self::Relu(a) => a.df(z),
            Self::Tanh(a) => a.df(z),
        }
    }

    /// Returns the specification this activation can be rebuilt from.
    pub fn spec(&self) -> ActFnSpec {
        match self {
            Self::Sigmoid(a) => ActFnSpec::Sigmoid { amp: a.amp() },
            Self::Relu(_) => ActFnSpec::Relu,
            Self::Tanh(_) => ActFnSpec::Tanh,
        }
    }
}

impl From<ActFnSpec> for ActFn {
    fn from(spec: ActFnSpec) -> Self {
        match spec {
            ActFnSpec::Sigmoid { amp } => ActFn::sigmoid(amp),
            ActFnSpec::Relu => ActFn::relu(),
            ActFnSpec::Tanh => ActFn::tanh(),
        }
    }
}
