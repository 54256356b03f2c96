use ndarray::{Array2, ArrayView2};

use super::{Dense, Input};
use crate::{
    arch::{activations::ActFn, spec::LayerSpec, tape::Trace},
    error::Result,
};

#[derive(Clone, Debug)]
enum Kind {
    Input(Input),
    Dense(Dense),
}

/// A named layer of a network.
#[derive(Clone, Debug)]
pub struct Layer {
    name: String,
    kind: Kind,
}

impl Layer {
    pub fn input(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            kind: Kind::Input(Input::new(shape)),
        }
    }

    pub fn dense(name: impl Into<String>, dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            name: name.into(),
            kind: Kind::Dense(Dense::new(dim, act_fn)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, Kind::Input(_))
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match &self.kind {
            Kind::Input(_) => 0,
            Kind::Dense(l) => l.size(),
        }
    }

    /// The per-sample shape this layer consumes, without the batch axis.
    pub fn input_shape(&self) -> Vec<usize> {
        match &self.kind {
            Kind::Input(l) => l.shape().to_vec(),
            Kind::Dense(l) => vec![l.dim().0],
        }
    }

    /// The per-sample shape this layer yields, without the batch axis.
    pub fn output_shape(&self) -> Vec<usize> {
        match &self.kind {
            Kind::Input(l) => vec![l.features()],
            Kind::Dense(l) => vec![l.dim().1],
        }
    }

    /// The amount of scalar values a single flattened sample has after this layer.
    pub fn units(&self) -> usize {
        self.output_shape().iter().product()
    }

    pub(crate) fn fan_in_out(&self) -> Option<(usize, usize)> {
        match &self.kind {
            Kind::Input(_) => None,
            Kind::Dense(l) => Some(l.dim()),
        }
    }

    pub fn forward(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        trace: &mut Trace,
    ) -> Result<Array2<f32>> {
        match &self.kind {
            Kind::Input(_) => Ok(x.to_owned()),
            Kind::Dense(l) => l.forward(params, x, trace),
        }
    }

    pub fn backward(
        &self,
        params: &[f32],
        grad: Option<&mut [f32]>,
        d: Array2<f32>,
        trace: &Trace,
    ) -> Result<Array2<f32>> {
        match &self.kind {
            Kind::Input(_) => Ok(d),
            Kind::Dense(l) => l.backward(params, grad, d, trace),
        }
    }

    pub fn spec(&self) -> LayerSpec {
        let name = self.name.clone();

        match &self.kind {
            Kind::Input(l) => LayerSpec::Input {
                name,
                shape: l.shape().to_vec(),
            },
            Kind::Dense(l) => LayerSpec::Dense {
                name,
                dim: l.dim(),
                act_fn: l.act_fn().map(ActFn::spec),
            },
        }
    }
}

impl From<&LayerSpec> for Layer {
    fn from(spec: &LayerSpec) -> Self {
        match spec {
            LayerSpec::Input { name, shape } => Layer::input(name.clone(), shape.clone()),
            LayerSpec::Dense { name, dim, act_fn } => {
                Layer::dense(name.clone(), *dim, act_fn.map(ActFn::from))
            }
        }
    }
}
