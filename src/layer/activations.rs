use rayon::prelude::*;

use crate::model::error::ArchitectureError;
use crate::model::layer_desc::Activation;
use crate::tensor::{Tensor, TensorDesc};

use super::layer::{input_mismatch, Layer, LayerGradients};

// ReLU, Sigmoid, Tanh
#[derive(Clone)]
pub struct ActivationLayer {
    pub activation_type: Activation,
}

impl ActivationLayer {
    pub fn new(activation_type: Activation) -> Self {
        Self { activation_type }
    }

    fn apply(&self, x: f32) -> f32 {
        match self.activation_type {
            Activation::Identity => x,
            Activation::ReLU => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }

    // Derivative expressed through the forward output
    fn derivative(&self, y: f32) -> f32 {
        match self.activation_type {
            Activation::Identity => 1.0,
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - y * y,
            Activation::Sigmoid => y * (1.0 - y),
        }
    }
}

impl Layer for ActivationLayer {
    fn name(&self) -> String {
        self.activation_type.to_string()
    }

    fn output_shape(&self, input: &TensorDesc) -> Result<TensorDesc, ArchitectureError> {
        Ok(*input)
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, ArchitectureError> {
        let mut output = input.clone();
        output.data_mut().par_iter_mut().for_each(|v| *v = self.apply(*v));
        Ok(output)
    }

    fn backward(&self, _input: &Tensor, output: &Tensor, grad_output: &Tensor) -> Result<LayerGradients, ArchitectureError> {
        if grad_output.desc() != output.desc() {
            return Err(input_mismatch(self, output.desc().to_string(), grad_output.desc()));
        }
        let mut grad_input = grad_output.clone();
        grad_input
            .data_mut()
            .par_iter_mut()
            .zip(output.data().par_iter())
            .for_each(|(g, &y)| *g *= self.derivative(y));

        Ok(LayerGradients {
            input: grad_input,
            parameters: Vec::new(),
        })
    }
}
