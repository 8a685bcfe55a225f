use rayon::prelude::*;

use crate::config::KernelConfig;
use crate::model::error::ArchitectureError;
use crate::tensor::{Tensor, TensorDesc};

use super::layer::{input_mismatch, Layer, LayerGradients};

/// Square-kernel 2D convolution without padding, NCHW layout.
#[derive(Clone)]
pub struct Conv2DLayer {
    pub in_features: usize,  // Input channels
    pub out_features: usize, // Output channels
    pub kernel: KernelConfig,
    // [weights (out, in, k, k), biases (out)]
    params: [Tensor; 2],
}

struct Geometry {
    batch: usize,
    height: usize,
    width: usize,
    out_height: usize,
    out_width: usize,
}

impl Conv2DLayer {
    pub fn new(in_features: usize, out_features: usize, kernel: KernelConfig) -> Self {
        let k = kernel.size();
        Self {
            in_features,
            out_features,
            kernel,
            params: [
                Tensor::zeros(TensorDesc::new_tensor4d(out_features, in_features, k, k)),
                Tensor::zeros(TensorDesc::new_vector(out_features)),
            ],
        }
    }

    fn geometry(&self, input: &TensorDesc) -> Result<Geometry, ArchitectureError> {
        let expected = || format!("N×{}×H×W with H, W ≥ {}", self.in_features, self.kernel.size());
        match *input {
            TensorDesc::Tensor4D {
                batch,
                channels,
                height,
                width,
            } if channels == self.in_features => {
                match (self.kernel.output_extent(height), self.kernel.output_extent(width)) {
                    (Some(out_height), Some(out_width)) => Ok(Geometry {
                        batch,
                        height,
                        width,
                        out_height,
                        out_width,
                    }),
                    _ => Err(input_mismatch(self, expected(), input)),
                }
            }
            _ => Err(input_mismatch(self, expected(), input)),
        }
    }
}

impl Layer for Conv2DLayer {
    fn name(&self) -> String {
        "Conv2D".to_string()
    }

    fn config_string(&self) -> Option<String> {
        Some(format!(
            "in_channels={}, out_channels={}, kernel={}",
            self.in_features, self.out_features, self.kernel
        ))
    }

    fn output_shape(&self, input: &TensorDesc) -> Result<TensorDesc, ArchitectureError> {
        let g = self.geometry(input)?;
        Ok(TensorDesc::new_tensor4d(g.batch, self.out_features, g.out_height, g.out_width))
    }

    fn parameters(&self) -> &[Tensor] {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut [Tensor] {
        &mut self.params
    }

    fn in_features(&self) -> usize {
        self.in_features
    }

    fn out_features(&self) -> usize {
        self.out_features
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, ArchitectureError> {
        let g = self.geometry(input.desc())?;
        let (k, s) = (self.kernel.size(), self.kernel.stride());
        let (cin, cout) = (self.in_features, self.out_features);
        let in_plane = g.height * g.width;
        let out_plane = g.out_height * g.out_width;
        let weights = self.params[0].data();
        let biases = self.params[1].data();
        let x = input.data();

        let mut output = Tensor::zeros(TensorDesc::new_tensor4d(g.batch, cout, g.out_height, g.out_width));
        output
            .data_mut()
            .par_chunks_mut(cout * out_plane)
            .enumerate()
            .for_each(|(n, out_n)| {
                let x_n = &x[n * cin * in_plane..(n + 1) * cin * in_plane];
                for o in 0..cout {
                    let w_o = &weights[o * cin * k * k..(o + 1) * cin * k * k];
                    for oy in 0..g.out_height {
                        for ox in 0..g.out_width {
                            let mut sum = biases[o];
                            for c in 0..cin {
                                let x_c = &x_n[c * in_plane..];
                                let w_c = &w_o[c * k * k..];
                                for ky in 0..k {
                                    let row = (oy * s + ky) * g.width + ox * s;
                                    for kx in 0..k {
                                        sum += w_c[ky * k + kx] * x_c[row + kx];
                                    }
                                }
                            }
                            out_n[o * out_plane + oy * g.out_width + ox] = sum;
                        }
                    }
                }
            });

        Ok(output)
    }

    fn backward(&self, input: &Tensor, _output: &Tensor, grad_output: &Tensor) -> Result<LayerGradients, ArchitectureError> {
        let g = self.geometry(input.desc())?;
        let expected_grad = self.output_shape(input.desc())?;
        if *grad_output.desc() != expected_grad {
            return Err(input_mismatch(self, expected_grad.to_string(), grad_output.desc()));
        }

        let (k, s) = (self.kernel.size(), self.kernel.stride());
        let (cin, cout) = (self.in_features, self.out_features);
        let in_plane = g.height * g.width;
        let out_plane = g.out_height * g.out_width;
        let weights = self.params[0].data();
        let x = input.data();
        let dy = grad_output.data();

        // Input gradient, one sample per task
        let mut grad_input = Tensor::zeros(*input.desc());
        grad_input
            .data_mut()
            .par_chunks_mut(cin * in_plane)
            .enumerate()
            .for_each(|(n, dx_n)| {
                let dy_n = &dy[n * cout * out_plane..(n + 1) * cout * out_plane];
                for o in 0..cout {
                    let w_o = &weights[o * cin * k * k..(o + 1) * cin * k * k];
                    for oy in 0..g.out_height {
                        for ox in 0..g.out_width {
                            let d = dy_n[o * out_plane + oy * g.out_width + ox];
                            if d == 0.0 {
                                continue;
                            }
                            for c in 0..cin {
                                for ky in 0..k {
                                    let row = c * in_plane + (oy * s + ky) * g.width + ox * s;
                                    for kx in 0..k {
                                        dx_n[row + kx] += w_o[c * k * k + ky * k + kx] * d;
                                    }
                                }
                            }
                        }
                    }
                }
            });

        // Weight and bias gradients, one output channel per task
        let mut grad_weights = Tensor::zeros(*self.params[0].desc());
        let mut grad_biases = Tensor::zeros(*self.params[1].desc());
        grad_weights
            .data_mut()
            .par_chunks_mut(cin * k * k)
            .zip(grad_biases.data_mut().par_iter_mut())
            .enumerate()
            .for_each(|(o, (dw_o, db_o))| {
                for n in 0..g.batch {
                    let dy_no = &dy[(n * cout + o) * out_plane..(n * cout + o + 1) * out_plane];
                    let x_n = &x[n * cin * in_plane..(n + 1) * cin * in_plane];
                    for oy in 0..g.out_height {
                        for ox in 0..g.out_width {
                            let d = dy_no[oy * g.out_width + ox];
                            *db_o += d;
                            if d == 0.0 {
                                continue;
                            }
                            for c in 0..cin {
                                for ky in 0..k {
                                    let row = c * in_plane + (oy * s + ky) * g.width + ox * s;
                                    for kx in 0..k {
                                        dw_o[c * k * k + ky * k + kx] += x_n[row + kx] * d;
                                    }
                                }
                            }
                        }
                    }
                }
            });

        Ok(LayerGradients {
            input: grad_input,
            parameters: vec![grad_weights, grad_biases],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::test_util::check_gradients;

    #[test]
    fn output_shape_has_no_padding() {
        let conv = Conv2DLayer::new(3, 8, KernelConfig::new(3, 1).unwrap());
        let out = conv.output_shape(&TensorDesc::new_tensor4d(2, 3, 32, 32)).unwrap();
        assert_eq!(out, TensorDesc::new_tensor4d(2, 8, 30, 30));
        assert!(conv.output_shape(&TensorDesc::new_tensor4d(2, 1, 32, 32)).is_err());
    }

    #[test]
    fn single_kernel_sums_window() {
        let mut conv = Conv2DLayer::new(1, 1, KernelConfig::new(2, 1).unwrap());
        conv.parameters_mut()[0].data_mut().fill(1.0);
        conv.parameters_mut()[1].data_mut()[0] = 0.5;
        let input = Tensor::new(
            TensorDesc::new_tensor4d(1, 1, 2, 3),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let out = conv.forward(&input).unwrap();
        assert_eq!(out.data(), &[12.5, 16.5]);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut conv = Conv2DLayer::new(2, 3, KernelConfig::new(2, 2).unwrap());
        check_gradients(&mut conv, TensorDesc::new_tensor4d(2, 2, 5, 5));
    }
}
