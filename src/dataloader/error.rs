use std::path::PathBuf;

use thiserror::Error;

use crate::tensor::ShapeError;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset root {} is missing or not a directory", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Invalid dataset split percentages. Train: {train}, Test: {test} (must sum to 100)")]
    InvalidSplit { train: u32, test: u32 },

    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("Invalid normalization bounds [{min}, {max}] (must be finite with min < max)")]
    InvalidNormalization { min: f32, max: f32 },

    #[error("Image shape {height}×{width}×{channels} is not supported (channels must be 1, 3 or 4)")]
    UnsupportedImageShape {
        height: usize,
        width: usize,
        channels: usize,
    },

    #[error("No images with extensions {extensions:?} found under {}", root.display())]
    EmptyDataset { root: PathBuf, extensions: Vec<String> },

    #[error("Found {found} labels but the dataset declares only {declared} classes")]
    TooManyLabels { found: usize, declared: usize },

    #[error("Failed to walk dataset directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to build decoding thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Batch prefetch worker stopped unexpectedly")]
    PrefetchDisconnected,

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl DatasetError {
    /// Short machine-readable failure category.
    pub fn reason(&self) -> &'static str {
        match self {
            DatasetError::MissingDirectory(_) => "missing-or-not-a-directory",
            DatasetError::InvalidSplit { .. } => "invalid-split",
            DatasetError::InvalidBatchSize => "invalid-batch-size",
            DatasetError::InvalidNormalization { .. } => "invalid-normalization",
            DatasetError::UnsupportedImageShape { .. } => "unsupported-image-shape",
            DatasetError::EmptyDataset { .. } => "empty-dataset",
            DatasetError::TooManyLabels { .. } => "too-many-labels",
            DatasetError::Walk(_) => "io",
            DatasetError::Decode { .. } => "decode",
            DatasetError::ThreadPool(_) => "thread-pool",
            DatasetError::PrefetchDisconnected => "prefetch-disconnected",
            DatasetError::Shape(_) => "shape",
        }
    }
}
