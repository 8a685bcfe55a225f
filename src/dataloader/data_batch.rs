use crate::tensor::{Tensor, TensorDesc};

/// A batch ready for the network: NCHW features scaled into the fitted bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct DataBatch {
    pub features: Tensor,
    pub labels: Vec<usize>,
    pub num_classes: usize,
    pub batch_number: usize,
}

impl DataBatch {
    pub fn samples_in_batch(&self) -> usize {
        self.labels.len()
    }

    /// Labels as an N×num_classes indicator matrix.
    pub fn one_hot(&self) -> Tensor {
        let mut targets = Tensor::zeros(TensorDesc::new_matrix(self.labels.len(), self.num_classes));
        let data = targets.data_mut();
        for (row, &label) in self.labels.iter().enumerate() {
            data[row * self.num_classes + label] = 1.0;
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_marks_each_label() {
        let batch = DataBatch {
            features: Tensor::zeros(TensorDesc::new_tensor4d(2, 1, 1, 1)),
            labels: vec![2, 0],
            num_classes: 3,
            batch_number: 0,
        };
        assert_eq!(batch.one_hot().data(), &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(batch.samples_in_batch(), 2);
    }
}
