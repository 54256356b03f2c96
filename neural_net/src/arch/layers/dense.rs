use ndarray::{linalg, prelude::*};

use crate::{
    arch::{activations::ActFn, tape::Trace},
    error::{NnErr, Result},
};

/// A fully connected layer, `a = act_fn(x · w + b)`.
///
/// The parameters are not owned by the layer, they are handed to it on each pass as a flat
/// slice laid out as the row major `dim.0 x dim.1` weights followed by the `dim.1` biases.
#[derive(Clone, Debug)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - The activation applied to the affine output, if any.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn act_fn(&self) -> Option<&ActFn> {
        self.act_fn.as_ref()
    }

    /// Makes a forward pass, leaving in `trace` what the backward pass needs.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `x` - A batch of inputs, one sample per row.
    /// * `trace` - Where to record the input and the pre-activation output.
    ///
    /// # Returns
    /// The activated output or an error if `params` or `x` don't fit this layer.
    pub fn forward(
        &self,
        params: &[f32],
        x: ArrayView2<f32>,
        trace: &mut Trace,
    ) -> Result<Array2<f32>> {
        if x.ncols() != self.dim.0 {
            return Err(NnErr::SizeMismatch {
                what: "dense input features",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let shape = (x.nrows(), self.dim.1);

        if trace.z.dim() != shape {
            trace.z = Array2::zeros(shape);
        }
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut trace.z);
        trace.z += &b;
        trace.x = x.to_owned();

        let a = match &self.act_fn {
            Some(act_fn) => trace.z.mapv(|z| act_fn.f(z)),
            None => trace.z.clone(),
        };

        Ok(a)
    }

    /// Makes a backward pass.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `grad` - Where to write the gradient of the parameters, `None` when only the
    ///   derivative with respect to the input is wanted.
    /// * `d` - The derivative of the objective with respect to this layer's output.
    /// * `trace` - The trace left by the matching forward pass.
    ///
    /// # Returns
    /// The derivative of the objective with respect to this layer's input.
    pub fn backward(
        &self,
        params: &[f32],
        grad: Option<&mut [f32]>,
        mut d: Array2<f32>,
        trace: &Trace,
    ) -> Result<Array2<f32>> {
        if d.dim() != trace.z.dim() {
            return Err(NnErr::SizeMismatch {
                what: "dense output delta",
                got: d.len(),
                expected: trace.z.len(),
            });
        }

        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(&trace.z, |d, &z| *d *= act_fn.df(z));
        }

        if let Some(grad) = grad {
            let (mut dw, mut db) = self.view_grad(grad)?;
            linalg::general_mat_mul(1.0, &trace.x.t(), &d, 0.0, &mut dw);
            db.assign(&d.sum_axis(Axis(0)));
        }

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("dense gradient", grad.len())?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).map_err(|_| self.mismatch(w_size))?;
        let db = ArrayViewMut1::from(db_raw);
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("dense parameters", params.len())?;

        let w_size = self.size - self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size);
        let w = ArrayView2::from_shape(self.dim, w_raw).map_err(|_| self.mismatch(w_size))?;
        let b = ArrayView1::from(b_raw);
        Ok((w, b))
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size {
            return Err(NnErr::SizeMismatch {
                what,
                got,
                expected: self.size,
            });
        }

        Ok(())
    }

    fn mismatch(&self, got: usize) -> NnErr {
        NnErr::SizeMismatch {
            what: "dense weights",
            got,
            expected: self.dim.0 * self.dim.1,
        }
    }
}
