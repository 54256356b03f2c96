use serde::{Deserialize, Serialize};

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Sigmoid { amp: f32 },
    Relu,
    Tanh,
}

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Input {
        name: String,
        shape: Vec<usize>,
    },
    Dense {
        name: String,
        dim: (usize, usize),
        act_fn: Option<ActFnSpec>,
    },
}

/// The specification for a `Sequential` network, its layers in forward order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub layers: Vec<LayerSpec>,
}

/// The specification for the initial values of a network's parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamInitSpec {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    #[default]
    XavierUniform,
    Kaiming,
    Lecun,
}
