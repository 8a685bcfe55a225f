use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tensor_desc::TensorDesc;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Tensor shape {desc} needs {expected} elements, got {actual}")]
pub struct ShapeError {
    pub desc: TensorDesc,
    pub expected: usize,
    pub actual: usize,
}

/// Dense row-major f32 tensor living on the CPU.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    desc: TensorDesc,
    data: Vec<f32>,
}

impl Tensor {
    pub fn new(desc: TensorDesc, data: Vec<f32>) -> Result<Self, ShapeError> {
        if data.len() != desc.num_elements() {
            return Err(ShapeError {
                desc,
                expected: desc.num_elements(),
                actual: data.len(),
            });
        }
        Ok(Self { desc, data })
    }

    pub fn zeros(desc: TensorDesc) -> Self {
        Self {
            desc,
            data: vec![0.0; desc.num_elements()],
        }
    }

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reinterprets the buffer under a new descriptor with the same element count.
    pub fn reshape(self, desc: TensorDesc) -> Result<Self, ShapeError> {
        Self::new(desc, self.data)
    }

    pub fn map_inplace(&mut self, f: impl Fn(f32) -> f32) {
        for v in self.data.iter_mut() {
            *v = f(*v);
        }
    }

    /// Index of the largest value in each row of a matrix. Ties go to the lowest index.
    pub fn argmax_rows(&self) -> Vec<usize> {
        let (rows, cols) = match self.desc {
            TensorDesc::Matrix { rows, cols } => (rows, cols),
            _ => (1, self.data.len()),
        };
        (0..rows)
            .map(|r| {
                let row = &self.data[r * cols..(r + 1) * cols];
                let mut best = 0;
                for (i, &v) in row.iter().enumerate() {
                    if v > row[best] {
                        best = i;
                    }
                }
                best
            })
            .collect()
    }
}
