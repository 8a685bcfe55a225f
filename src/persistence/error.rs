use std::path::PathBuf;

use thiserror::Error;

use crate::tensor::TensorDesc;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Model artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Model artifact {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Model artifact holds {actual} parameter tensors, architecture needs {expected}")]
    TensorCountMismatch { expected: usize, actual: usize },

    #[error("Parameter tensor {index}: architecture needs {expected}, artifact holds {actual}")]
    ShapeMismatch {
        index: usize,
        expected: TensorDesc,
        actual: TensorDesc,
    },

    #[error("I/O error on model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode model artifact: {0}")]
    Encode(#[from] bincode::Error),
}

impl PersistenceError {
    pub fn reason(&self) -> &'static str {
        match self {
            PersistenceError::NotFound { .. } => "not-found",
            PersistenceError::Corrupt { .. } => "corrupt",
            PersistenceError::TensorCountMismatch { .. } | PersistenceError::ShapeMismatch { .. } => "shape-mismatch",
            PersistenceError::Io { .. } => "io",
            PersistenceError::Encode(_) => "encode",
        }
    }
}
