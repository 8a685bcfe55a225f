use rayon::prelude::*;

use crate::config::KernelConfig;
use crate::model::error::ArchitectureError;
use crate::tensor::{Tensor, TensorDesc};

use super::layer::{input_mismatch, Layer, LayerGradients};

#[derive(Clone)]
pub struct MaxPoolLayer {
    pub kernel: KernelConfig,
}

impl MaxPoolLayer {
    pub fn new(kernel: KernelConfig) -> Self {
        Self { kernel }
    }

    // Offset of the largest value in the window starting at (oy, ox); first wins on ties
    fn argmax(&self, plane: &[f32], width: usize, oy: usize, ox: usize) -> usize {
        let (k, s) = (self.kernel.size(), self.kernel.stride());
        let mut best = (oy * s) * width + ox * s;
        for ky in 0..k {
            for kx in 0..k {
                let idx = (oy * s + ky) * width + ox * s + kx;
                if plane[idx] > plane[best] {
                    best = idx;
                }
            }
        }
        best
    }
}

impl Layer for MaxPoolLayer {
    fn name(&self) -> String {
        "MaxPool".to_string()
    }

    fn config_string(&self) -> Option<String> {
        Some(format!("kernel={}", self.kernel))
    }

    fn output_shape(&self, input: &TensorDesc) -> Result<TensorDesc, ArchitectureError> {
        if let TensorDesc::Tensor4D {
            batch,
            channels,
            height,
            width,
        } = *input
        {
            if let (Some(h), Some(w)) = (self.kernel.output_extent(height), self.kernel.output_extent(width)) {
                return Ok(TensorDesc::new_tensor4d(batch, channels, h, w));
            }
        }
        Err(input_mismatch(
            self,
            format!("N×C×H×W with H, W ≥ {}", self.kernel.size()),
            input,
        ))
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, ArchitectureError> {
        let out_desc = self.output_shape(input.desc())?;
        let TensorDesc::Tensor4D {
            height: out_height,
            width: out_width,
            ..
        } = out_desc
        else {
            return Err(input_mismatch(self, "N×C×H×W", input.desc()));
        };
        let TensorDesc::Tensor4D { height, width, .. } = *input.desc() else {
            return Err(input_mismatch(self, "N×C×H×W", input.desc()));
        };

        let x = input.data();
        let mut output = Tensor::zeros(out_desc);
        // Every (sample, channel) plane is independent
        output
            .data_mut()
            .par_chunks_mut(out_height * out_width)
            .enumerate()
            .for_each(|(plane_idx, out_plane)| {
                let plane = &x[plane_idx * height * width..(plane_idx + 1) * height * width];
                for oy in 0..out_height {
                    for ox in 0..out_width {
                        out_plane[oy * out_width + ox] = plane[self.argmax(plane, width, oy, ox)];
                    }
                }
            });

        Ok(output)
    }

    fn backward(&self, input: &Tensor, output: &Tensor, grad_output: &Tensor) -> Result<LayerGradients, ArchitectureError> {
        if grad_output.desc() != output.desc() {
            return Err(input_mismatch(self, output.desc().to_string(), grad_output.desc()));
        }
        let TensorDesc::Tensor4D {
            height: out_height,
            width: out_width,
            ..
        } = *output.desc()
        else {
            return Err(input_mismatch(self, "N×C×H×W", output.desc()));
        };
        let TensorDesc::Tensor4D { height, width, .. } = *input.desc() else {
            return Err(input_mismatch(self, "N×C×H×W", input.desc()));
        };

        let x = input.data();
        let dy = grad_output.data();
        let mut grad_input = Tensor::zeros(*input.desc());
        grad_input
            .data_mut()
            .par_chunks_mut(height * width)
            .enumerate()
            .for_each(|(plane_idx, dx_plane)| {
                let plane = &x[plane_idx * height * width..(plane_idx + 1) * height * width];
                let dy_plane = &dy[plane_idx * out_height * out_width..(plane_idx + 1) * out_height * out_width];
                for oy in 0..out_height {
                    for ox in 0..out_width {
                        dx_plane[self.argmax(plane, width, oy, ox)] += dy_plane[oy * out_width + ox];
                    }
                }
            });

        Ok(LayerGradients {
            input: grad_input,
            parameters: Vec::new(),
        })
    }
}
