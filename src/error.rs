use thiserror::Error;

use crate::config::ConfigLoadError;
use crate::dataloader::DatasetError;
use crate::model::ArchitectureError;
use crate::persistence::PersistenceError;

/// Top-level failure, naming the stage that failed and carrying its cause.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("dataset initialization failed: {0}")]
    Dataset(#[from] DatasetError),

    #[error("{stage} batch could not be loaded: {source}")]
    BatchLoad {
        stage: &'static str,
        #[source]
        source: DatasetError,
    },

    #[error("model construction failed: {0}")]
    Architecture(#[from] ArchitectureError),

    #[error("{stage} step failed: {source}")]
    Step {
        stage: &'static str,
        #[source]
        source: ArchitectureError,
    },

    #[error("model persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("configuration loading failed: {0}")]
    Config(#[from] ConfigLoadError),
}

impl ClassifierError {
    pub fn stage(&self) -> &'static str {
        match self {
            ClassifierError::Dataset(_) => "dataset",
            ClassifierError::BatchLoad { stage, .. } | ClassifierError::Step { stage, .. } => stage,
            ClassifierError::Architecture(_) => "model",
            ClassifierError::Persistence(_) => "persistence",
            ClassifierError::Config(_) => "config",
        }
    }
}
