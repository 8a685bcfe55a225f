pub mod config;
pub mod dataloader;
pub mod error;
pub mod layer;
pub mod model;
pub mod persistence;
pub mod tensor;
pub mod training;

pub use config::{ClassifierConfig, ConfigLoader, ConvolutionConfig, JsonConfigLoader, KernelConfig};
pub use dataloader::{DataLoaderConfig, DataSetIterator, Dataset, DatasetPipeline};
pub use error::ClassifierError;
pub use model::{ModelBuilder, NetworkSpec, TrainedNetwork};
pub use persistence::ModelPersistence;
pub use training::{Evaluator, Metrics, TrainingLoop};
