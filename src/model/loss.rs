use rayon::prelude::*;

use crate::tensor::{Tensor, TensorDesc};

use super::error::ArchitectureError;

/// Row-wise softmax of an N×K logit matrix.
pub fn softmax(logits: &Tensor) -> Result<Tensor, ArchitectureError> {
    let (_, classes) = matrix_dims(logits)?;
    let mut probs = logits.clone();
    probs
        .data_mut()
        .par_chunks_mut(classes)
        .for_each(softmax_row_inplace);
    Ok(probs)
}

fn softmax_row_inplace(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in row.iter_mut() {
        *v /= sum;
    }
}

/// Mean negative log-likelihood of softmax(`logits`) against `labels`, and
/// its gradient with respect to the logits, `(p - onehot) / n`.
pub fn softmax_cross_entropy(logits: &Tensor, labels: &[usize]) -> Result<(f32, Tensor), ArchitectureError> {
    let (rows, classes) = matrix_dims(logits)?;
    if rows != labels.len() {
        return Err(ArchitectureError::InputMismatch {
            layer: "Loss".to_string(),
            expected: format!("{} rows", labels.len()),
            actual: *logits.desc(),
        });
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= classes) {
        return Err(ArchitectureError::ClassCountMismatch {
            network: classes,
            data: label + 1,
        });
    }

    let mut grad = softmax(logits)?;
    let n = rows.max(1) as f32;

    let loss: f32 = grad
        .data_mut()
        .chunks_mut(classes)
        .zip(labels)
        .map(|(row, &label)| {
            let nll = -row[label].max(f32::MIN_POSITIVE).ln();
            row[label] -= 1.0;
            for v in row.iter_mut() {
                *v /= n;
            }
            nll
        })
        .sum::<f32>()
        / n;

    Ok((loss, grad))
}

fn matrix_dims(t: &Tensor) -> Result<(usize, usize), ArchitectureError> {
    match *t.desc() {
        TensorDesc::Matrix { rows, cols } if cols > 0 => Ok((rows, cols)),
        other => Err(ArchitectureError::InputMismatch {
            layer: "Loss".to_string(),
            expected: "N×classes logits".to_string(),
            actual: other,
        }),
    }
}
