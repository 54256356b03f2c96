use crate::Result;

/// Defines the strategy for updating model parameters based on calculated gradients.
pub trait Optimizer {
    /// The name this optimization algorithm is known by.
    fn name(&self) -> &'static str;

    /// Updates the provided slice of parameters using the gradient.
    ///
    /// # Arguments
    /// * `params` - The parameters to update.
    /// * `grad` - A reference to the model's gradient.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad` and `params`.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) -> Result<()>;
}
