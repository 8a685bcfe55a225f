use thiserror::Error;

use crate::tensor::{ShapeError, TensorDesc};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArchitectureError {
    #[error("Network has no layers")]
    EmptyNetwork,

    #[error("Layer {layer}: expected {expected} input channels, incoming activation has {actual}")]
    ChannelMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Layer {layer}: expected {expected} input features, incoming activation has {actual}")]
    FeatureMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Layer {layer}: kernel {kernel} does not fit a {height}×{width} input")]
    KernelTooLarge {
        layer: usize,
        kernel: usize,
        height: usize,
        width: usize,
    },

    #[error("Layer {layer}: needs a spatial input but follows a dense layer")]
    SpatialInputRequired { layer: usize },

    #[error("Layer {layer}: zero-sized dimension")]
    ZeroSized { layer: usize },

    #[error("Network must end with an output layer")]
    MissingOutput,

    #[error("Layer {layer}: output layer must be the last layer")]
    OutputNotLast { layer: usize },

    #[error("Invalid hyperparameter {name} = {value}")]
    InvalidHyperparameter { name: &'static str, value: f32 },

    #[error("{layer} expects input {expected}, got {actual}")]
    InputMismatch {
        layer: String,
        expected: String,
        actual: TensorDesc,
    },

    #[error("Network predicts {network} classes but the data has {data}")]
    ClassCountMismatch { network: usize, data: usize },

    #[error("Parameter {index} has no matching optimizer slot")]
    OptimizerSlotMismatch { index: usize },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}
