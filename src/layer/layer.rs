use crate::model::error::ArchitectureError;
use crate::tensor::{Tensor, TensorDesc};

/// Gradients produced by one backward pass through a layer.
pub struct LayerGradients {
    /// Gradient with respect to the layer's input, same shape as the input.
    pub input: Tensor,
    /// One gradient per entry of [`Layer::parameters`], in the same order.
    pub parameters: Vec<Tensor>,
}

pub trait Layer: Send + Sync {
    // Return a string representation of the layers name
    fn name(&self) -> String;

    // Return optional configuration details for the layer
    fn config_string(&self) -> Option<String> {
        None
    }

    // Calculate the output shape for a batch input
    fn output_shape(&self, input: &TensorDesc) -> Result<TensorDesc, ArchitectureError>;

    // Weights first, then biases
    fn parameters(&self) -> &[Tensor] {
        &[]
    }

    fn parameters_mut(&mut self) -> &mut [Tensor] {
        &mut []
    }

    // Return the total number of parameters in this layer
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(Tensor::len).sum()
    }

    // Get input features
    fn in_features(&self) -> usize {
        0
    }

    // Get output features
    fn out_features(&self) -> usize {
        0
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, ArchitectureError>;

    /// Backpropagates `grad_output` given the `input` and `output` of the
    /// matching forward call.
    fn backward(&self, input: &Tensor, output: &Tensor, grad_output: &Tensor) -> Result<LayerGradients, ArchitectureError>;
}

pub(crate) fn input_mismatch(layer: &dyn Layer, expected: impl Into<String>, actual: &TensorDesc) -> ArchitectureError {
    ArchitectureError::InputMismatch {
        layer: layer.name(),
        expected: expected.into(),
        actual: *actual,
    }
}
