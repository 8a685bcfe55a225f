use crate::model::error::ArchitectureError;
use crate::tensor::{Tensor, TensorDesc};

use super::layer::{Layer, LayerGradients};

/// Flattens N×C×H×W activations into an N×(C·H·W) matrix for dense layers.
#[derive(Clone, Default)]
pub struct FlattenLayer;

impl FlattenLayer {
    pub fn new() -> Self {
        Self
    }
}

impl Layer for FlattenLayer {
    fn name(&self) -> String {
        "Flatten".to_string()
    }

    fn output_shape(&self, input: &TensorDesc) -> Result<TensorDesc, ArchitectureError> {
        let batch = input.batch();
        let features = if batch == 0 { 0 } else { input.num_elements() / batch };
        Ok(TensorDesc::new_matrix(batch, features))
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, ArchitectureError> {
        let desc = self.output_shape(input.desc())?;
        Ok(input.clone().reshape(desc)?)
    }

    fn backward(&self, input: &Tensor, _output: &Tensor, grad_output: &Tensor) -> Result<LayerGradients, ArchitectureError> {
        Ok(LayerGradients {
            input: grad_output.clone().reshape(*input.desc())?,
            parameters: Vec::new(),
        })
    }
}
