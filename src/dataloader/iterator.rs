use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::tensor::{Tensor, TensorDesc};

use super::config::ImageShape;
use super::data_batch::DataBatch;
use super::error::DatasetError;
use super::normalizer::ImageScaler;
use super::par_iter::PrefetchIterator;
use super::sample::decode_sample;

/// A restartable stream of batches over one split.
pub trait DataSetIterator: Iterator<Item = Result<DataBatch, DatasetError>> {
    /// Rewinds to the first batch. Order and scaling are unchanged.
    fn reset(&mut self);

    fn batch_size(&self) -> usize;

    fn num_classes(&self) -> usize;

    fn num_samples(&self) -> usize;

    fn num_batches(&self) -> usize {
        self.num_samples().div_ceil(self.batch_size())
    }
}

/// Everything needed to materialize any batch of a split on demand.
pub(crate) struct SplitSource {
    entries: Vec<(PathBuf, usize)>,
    shape: ImageShape,
    num_classes: usize,
    batch_size: usize,
    scaler: Arc<ImageScaler>,
    pool: Arc<ThreadPool>,
}

impl SplitSource {
    pub(crate) fn new(
        entries: Vec<(PathBuf, usize)>,
        shape: ImageShape,
        num_classes: usize,
        batch_size: usize,
        scaler: Arc<ImageScaler>,
        pool: Arc<ThreadPool>,
    ) -> Self {
        Self {
            entries,
            shape,
            num_classes,
            batch_size,
            scaler,
            pool,
        }
    }

    pub(crate) fn load_batch(&self, batch_number: usize) -> Option<Result<DataBatch, DatasetError>> {
        let start = batch_number.checked_mul(self.batch_size)?;
        if start >= self.entries.len() {
            return None;
        }
        let end = (start + self.batch_size).min(self.entries.len());
        Some(self.decode_batch(batch_number, &self.entries[start..end]))
    }

    fn decode_batch(&self, batch_number: usize, chunk: &[(PathBuf, usize)]) -> Result<DataBatch, DatasetError> {
        let ImageShape {
            height,
            width,
            channels,
        } = self.shape;
        let per_image = self.shape.pixels_per_image();
        let mut features = vec![0.0f32; chunk.len() * per_image];

        self.pool.install(|| {
            features
                .par_chunks_exact_mut(per_image)
                .zip(chunk.par_iter())
                .try_for_each(|(out, (path, label))| -> Result<(), DatasetError> {
                    let sample = decode_sample(path, *label, self.shape)?;
                    self.scaler
                        .transform_hwc_into_chw(&sample.pixels, height, width, channels, out);
                    Ok(())
                })
        })?;

        let features = Tensor::new(
            TensorDesc::new_tensor4d(chunk.len(), channels, height, width),
            features,
        )?;

        Ok(DataBatch {
            features,
            labels: chunk.iter().map(|(_, label)| *label).collect(),
            num_classes: self.num_classes,
            batch_number,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub(crate) fn num_classes(&self) -> usize {
        self.num_classes
    }
}

/// Lazy batch iterator; each call to `next` decodes one batch on the pipeline's pool.
pub struct BatchIterator {
    source: Arc<SplitSource>,
    cursor: usize,
}

impl BatchIterator {
    pub(crate) fn new(source: SplitSource) -> Self {
        Self {
            source: Arc::new(source),
            cursor: 0,
        }
    }

    pub fn scaler(&self) -> &ImageScaler {
        &self.source.scaler
    }

    pub fn image_shape(&self) -> ImageShape {
        self.source.shape
    }

    /// Moves decoding to a background thread that keeps up to `depth`
    /// batches ready. The returned iterator starts at batch 0.
    pub fn prefetch(&self, depth: usize) -> PrefetchIterator {
        PrefetchIterator::new(Arc::clone(&self.source), depth)
    }
}

impl Iterator for BatchIterator {
    type Item = Result<DataBatch, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.source.load_batch(self.cursor)?;
        self.cursor += 1;
        Some(batch)
    }
}

impl DataSetIterator for BatchIterator {
    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn batch_size(&self) -> usize {
        self.source.batch_size()
    }

    fn num_classes(&self) -> usize {
        self.source.num_classes()
    }

    fn num_samples(&self) -> usize {
        self.source.len()
    }
}
