use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorDesc {
    // For vectors/1D tensors (e.g., biases)
    Vector { length: usize },

    // For matrices/2D tensors (e.g., dense weights, flattened batches)
    Matrix { rows: usize, cols: usize },

    // For 4D tensors (e.g., conv weights, NCHW image batches)
    Tensor4D {
        batch: usize,
        channels: usize,
        height: usize,
        width: usize,
    },
}

impl TensorDesc {
    pub fn new_vector(length: usize) -> Self {
        Self::Vector { length }
    }

    pub fn new_matrix(rows: usize, cols: usize) -> Self {
        Self::Matrix { rows, cols }
    }

    pub fn new_tensor4d(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self::Tensor4D {
            batch,
            channels,
            height,
            width,
        }
    }

    pub fn num_elements(&self) -> usize {
        match self {
            Self::Vector { length } => *length,
            Self::Matrix { rows, cols } => rows * cols,
            Self::Tensor4D {
                batch,
                channels,
                height,
                width,
            } => batch * channels * height * width,
        }
    }

    /// `None` when the element count does not fit in `usize`.
    pub fn checked_num_elements(&self) -> Option<usize> {
        match *self {
            Self::Vector { length } => Some(length),
            Self::Matrix { rows, cols } => rows.checked_mul(cols),
            Self::Tensor4D {
                batch,
                channels,
                height,
                width,
            } => batch.checked_mul(channels)?.checked_mul(height)?.checked_mul(width),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            Self::Vector { .. } => 1,
            Self::Matrix { .. } => 2,
            Self::Tensor4D { .. } => 4,
        }
    }

    /// Leading dimension, i.e. the number of samples for activations.
    pub fn batch(&self) -> usize {
        match self {
            Self::Vector { length } => *length,
            Self::Matrix { rows, .. } => *rows,
            Self::Tensor4D { batch, .. } => *batch,
        }
    }

    pub fn to_dims(&self) -> Vec<usize> {
        match self {
            Self::Vector { length } => vec![*length],
            Self::Matrix { rows, cols } => vec![*rows, *cols],
            Self::Tensor4D {
                batch,
                channels,
                height,
                width,
            } => vec![*batch, *channels, *height, *width],
        }
    }
}

impl std::fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims = self
            .to_dims()
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("×");
        write!(f, "[{}]", dims)
    }
}
