use std::path::PathBuf;

use tracing::info;

use super::config::ImageShape;

/// Summary of a built dataset, logged once the pipeline is ready.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub root: PathBuf,
    pub label_names: Vec<String>,
    pub train_label_counts: Vec<usize>,
    pub test_label_counts: Vec<usize>,
    pub train_size: usize,
    pub test_size: usize,
    pub batch_size: usize,
    pub image_shape: ImageShape,
    pub observed_range: Option<(u8, u8)>,
    pub seed: u64,
}

impl DatasetInfo {
    pub fn total_size(&self) -> usize {
        self.train_size + self.test_size
    }

    pub fn train_batches(&self) -> usize {
        self.train_size.div_ceil(self.batch_size)
    }

    pub fn test_batches(&self) -> usize {
        self.test_size.div_ceil(self.batch_size)
    }

    pub fn log(&self) {
        let total = self.total_size().max(1) as f32;

        info!("Dataset {} ({} images, {})", self.root.display(), self.total_size(), self.image_shape);
        info!(
            "Train split: {} images ({:.2}%), {} batches of {}, last batch {}",
            self.train_size,
            self.train_size as f32 * 100.0 / total,
            self.train_batches(),
            self.batch_size,
            last_batch(self.train_size, self.batch_size)
        );
        info!(
            "Test split: {} images ({:.2}%), {} batches of {}, last batch {}",
            self.test_size,
            self.test_size as f32 * 100.0 / total,
            self.test_batches(),
            self.batch_size,
            last_batch(self.test_size, self.batch_size)
        );
        for (label, name) in self.label_names.iter().enumerate() {
            info!(
                "  [{}] {}: train {}, test {}",
                label, name, self.train_label_counts[label], self.test_label_counts[label]
            );
        }
        info!("Raw pixel range: {:?}, seed: {}", self.observed_range, self.seed);
    }
}

fn last_batch(size: usize, batch_size: usize) -> usize {
    match size % batch_size {
        0 if size > 0 => batch_size,
        rem => rem,
    }
}
