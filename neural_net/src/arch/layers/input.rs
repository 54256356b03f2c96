/// The entry point of a network. It declares the per-sample shape the network expects,
/// a batch is always fed flattened as `(samples, shape.iter().product())`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    shape: Vec<usize>,
}

impl Input {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }

    /// The declared per-sample shape, without the batch axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The amount of scalar features of a single flattened sample.
    pub fn features(&self) -> usize {
        self.shape.iter().product()
    }
}
