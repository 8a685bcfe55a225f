pub mod config;
pub mod data_batch;
pub mod discovery;
pub mod error;
pub mod info;
pub mod iterator;
pub mod normalizer;
pub mod par_iter;
pub mod pipeline;
pub mod sample;
pub mod split;

pub use config::{DataLoaderConfig, ImageShape, ScalingMode};
pub use data_batch::DataBatch;
pub use error::DatasetError;
pub use info::DatasetInfo;
pub use iterator::{BatchIterator, DataSetIterator};
pub use normalizer::ImageScaler;
pub use par_iter::PrefetchIterator;
pub use pipeline::{Dataset, DatasetPipeline};
pub use sample::{decode_sample, LabeledSample};
pub use split::{balanced_split, train_counts, Split};
