use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::info;

use super::config::DataLoaderConfig;
use super::discovery::discover_images;
use super::error::DatasetError;
use super::info::DatasetInfo;
use super::iterator::{BatchIterator, SplitSource};
use super::normalizer::ImageScaler;
use super::sample::decode_sample;
use super::split::{balanced_split, Split};

/// Train and test iterators over one labeled image directory.
pub struct Dataset {
    pub train: BatchIterator,
    pub test: BatchIterator,
    pub label_names: Vec<String>,
    pub info: DatasetInfo,
}

pub struct DatasetPipeline;

impl DatasetPipeline {
    /// Scans, splits and fits the scaler. Any unreadable image fails the
    /// whole build rather than being skipped.
    pub fn build(config: &DataLoaderConfig) -> Result<Dataset, DatasetError> {
        config.validate()?;

        let extensions = config.normalized_extensions();
        let files = discover_images(&config.root_dir, &extensions, config.num_classes)?;
        info!(
            "Discovered {} images in {} labels under {}",
            files.total(),
            files.label_names.len(),
            config.root_dir.display()
        );

        let (train, test) = balanced_split(&files, config.train_percent, config.seed);

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(config.threads.max(1))
                .thread_name(|i| format!("image-decode-{i}"))
                .build()?,
        );

        let mut scaler = ImageScaler::new(config.normalization_min, config.normalization_max, config.scaling);
        let ranges = pool.install(|| -> Result<Vec<Option<(u8, u8)>>, DatasetError> {
            train
                .entries()
                .par_iter()
                .chain(test.entries().par_iter())
                .map(|(path, label)| {
                    decode_sample(path, *label, config.image_shape).map(|sample| sample.pixel_range())
                })
                .collect()
        })?;
        scaler.fit(ranges.into_iter().flatten());
        let scaler = Arc::new(scaler);

        let num_labels = files.label_names.len();
        let info = DatasetInfo {
            root: config.root_dir.clone(),
            label_names: files.label_names.clone(),
            train_label_counts: train.label_counts(num_labels),
            test_label_counts: test.label_counts(num_labels),
            train_size: train.len(),
            test_size: test.len(),
            batch_size: config.batch_size,
            image_shape: config.image_shape,
            observed_range: scaler.observed_range(),
            seed: config.seed,
        };

        let iterator = |split: Split| {
            BatchIterator::new(SplitSource::new(
                split.into_entries(),
                config.image_shape,
                config.num_classes,
                config.batch_size,
                Arc::clone(&scaler),
                Arc::clone(&pool),
            ))
        };

        Ok(Dataset {
            train: iterator(train),
            test: iterator(test),
            label_names: files.label_names,
            info,
        })
    }
}
