use ndarray::Array2;

/// What a single layer remembers from its forward pass in order to run backwards.
#[derive(Debug, Clone)]
pub struct Trace {
    pub(crate) x: Array2<f32>,
    pub(crate) z: Array2<f32>,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            x: Array2::zeros((0, 0)),
            z: Array2::zeros((0, 0)),
        }
    }
}

/// The forward metadata of a whole network.
///
/// A `Tape` is an execution context: networks are only ever borrowed immutably while
/// evaluating, so any number of tapes can drive the same network from different threads.
#[derive(Debug, Clone, Default)]
pub struct Tape {
    traces: Vec<Trace>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes room for `n` layer traces, reusing the buffers already allocated.
    pub(crate) fn prepare(&mut self, n: usize) {
        self.traces.resize_with(n, Trace::default);
    }

    pub(crate) fn trace_mut(&mut self, i: usize) -> &mut Trace {
        &mut self.traces[i]
    }

    pub(crate) fn trace(&self, i: usize) -> &Trace {
        &self.traces[i]
    }

    pub(crate) fn len(&self) -> usize {
        self.traces.len()
    }
}
