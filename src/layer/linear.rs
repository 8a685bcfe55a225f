use rayon::prelude::*;

use crate::model::error::ArchitectureError;
use crate::tensor::{Tensor, TensorDesc};

use super::layer::{input_mismatch, Layer, LayerGradients};

/// Fully connected layer over an N×in_features matrix.
#[derive(Clone)]
pub struct LinearLayer {
    pub in_features: usize,
    pub out_features: usize,
    // [weights (out, in), biases (out)]
    params: [Tensor; 2],
}

impl LinearLayer {
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            in_features,
            out_features,
            params: [
                Tensor::zeros(TensorDesc::new_matrix(out_features, in_features)),
                Tensor::zeros(TensorDesc::new_vector(out_features)),
            ],
        }
    }

    fn batch(&self, input: &TensorDesc) -> Result<usize, ArchitectureError> {
        match *input {
            TensorDesc::Matrix { rows, cols } if cols == self.in_features => Ok(rows),
            _ => Err(input_mismatch(self, format!("N×{}", self.in_features), input)),
        }
    }
}

impl Layer for LinearLayer {
    fn name(&self) -> String {
        "Linear".to_string()
    }

    fn config_string(&self) -> Option<String> {
        Some(format!(
            "in_features={}, out_features={}",
            self.in_features, self.out_features
        ))
    }

    fn output_shape(&self, input: &TensorDesc) -> Result<TensorDesc, ArchitectureError> {
        Ok(TensorDesc::new_matrix(self.batch(input)?, self.out_features))
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
        let batch = self.batch(input.desc())?;
        let (fin, fout) = (self.in_features, self.out_features);
        let weights = self.params[0].data();
        let biases = self.params[1].data();
        let x = input.data();

        let mut output = Tensor::zeros(TensorDesc::new_matrix(batch, fout));
        output
            .data_mut()
            .par_chunks_mut(fout)
            .enumerate()
            .for_each(|(n, y_n)| {
                let x_n = &x[n * fin..(n + 1) * fin];
                for (o, y) in y_n.iter_mut().enumerate() {
                    let w_o = &weights[o * fin..(o + 1) * fin];
                    *y = biases[o] + w_o.iter().zip(x_n).map(|(w, v)| w * v).sum::<f32>();
                }
            });

        Ok(output)
    }

    fn backward(&self, input: &Tensor, _output: &Tensor, grad_output: &Tensor) -> Result<LayerGradients, ArchitectureError> {
        let batch = self.batch(input.desc())?;
        let (fin, fout) = (self.in_features, self.out_features);
        let expected = TensorDesc::new_matrix(batch, fout);
        if *grad_output.desc() != expected {
            return Err(input_mismatch(self, expected.to_string(), grad_output.desc()));
        }

        let weights = self.params[0].data();
        let x = input.data();
        let dy = grad_output.data();

        let mut grad_input = Tensor::zeros(*input.desc());
        grad_input
            .data_mut()
            .par_chunks_mut(fin)
            .enumerate()
            .for_each(|(n, dx_n)| {
                let dy_n = &dy[n * fout..(n + 1) * fout];
                for (o, &d) in dy_n.iter().enumerate() {
                    if d == 0.0 {
                        continue;
                    }
                    let w_o = &weights[o * fin..(o + 1) * fin];
                    for (dx, w) in dx_n.iter_mut().zip(w_o) {
                        *dx += w * d;
                    }
                }
            });

        let mut grad_weights = Tensor::zeros(*self.params[0].desc());
        let mut grad_biases = Tensor::zeros(*self.params[1].desc());
        grad_weights
            .data_mut()
            .par_chunks_mut(fin)
            .zip(grad_biases.data_mut().par_iter_mut())
            .enumerate()
            .for_each(|(o, (dw_o, db_o))| {
                for n in 0..batch {
                    let d = dy[n * fout + o];
                    *db_o += d;
                    if d == 0.0 {
                        continue;
                    }
                    let x_n = &x[n * fin..(n + 1) * fin];
                    for (dw, v) in dw_o.iter_mut().zip(x_n) {
                        *dw += v * d;
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
    fn computes_affine_map() {
        let mut dense = LinearLayer::new(2, 1);
        dense.parameters_mut()[0].data_mut().copy_from_slice(&[2.0, -1.0]);
        dense.parameters_mut()[1].data_mut()[0] = 0.5;
        let input = Tensor::new(TensorDesc::new_matrix(2, 2), vec![1.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(dense.forward(&input).unwrap().data(), &[1.5, 4.5]);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let dense = LinearLayer::new(4, 2);
        let input = Tensor::zeros(TensorDesc::new_matrix(1, 3));
        assert!(matches!(
            dense.forward(&input),
            Err(ArchitectureError::InputMismatch { .. })
        ));
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut dense = LinearLayer::new(6, 4);
        check_gradients(&mut dense, TensorDesc::new_matrix(3, 6));
    }
}
