use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::discovery::DiscoveredFiles;

/// Ordered file list of one side of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    entries: Vec<(PathBuf, usize)>,
    target: usize,
}

impl Split {
    pub fn entries(&self) -> &[(PathBuf, usize)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(PathBuf, usize)> {
        self.entries
    }

    /// Sample count this side was sized for.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn label_counts(&self, num_labels: usize) -> Vec<usize> {
        let mut counts = vec![0; num_labels];
        for (_, label) in &self.entries {
            if let Some(count) = counts.get_mut(*label) {
                *count += 1;
            }
        }
        counts
    }
}

/// Number of train samples per label for a `train_percent` split.
///
/// Each label first gets `floor(n * p / 100)`. The overall train size is
/// `total * p / 100` rounded half up, and the slots still missing from that
/// go one apiece to the leading labels whose share was fractional.
pub fn train_counts(counts: &[usize], train_percent: u32) -> Vec<usize> {
    let p = train_percent as usize;
    let total: usize = counts.iter().sum();
    let target = (total * p + 50) / 100;

    let mut train: Vec<usize> = counts.iter().map(|&n| n * p / 100).collect();
    let mut remaining = target.saturating_sub(train.iter().sum());

    for (slot, &n) in train.iter_mut().zip(counts) {
        if remaining == 0 {
            break;
        }
        if (n * p) % 100 != 0 {
            *slot += 1;
            remaining -= 1;
        }
    }

    train
}

/// Partitions discovered files so every label keeps its share on both sides.
///
/// All shuffling draws from one `StdRng` seeded with `seed`, labels in sorted
/// order, so the same tree and seed always give the same two lists.
pub fn balanced_split(files: &DiscoveredFiles, train_percent: u32, seed: u64) -> (Split, Split) {
    let mut rng = StdRng::seed_from_u64(seed);
    let counts = files.counts();
    let per_label_train = train_counts(&counts, train_percent);

    let train_target: usize = per_label_train.iter().sum();
    let mut train = Vec::with_capacity(train_target);
    let mut test = Vec::with_capacity(files.total() - train_target);

    for (label, (paths, &take)) in files.by_label.iter().zip(&per_label_train).enumerate() {
        let mut shuffled = paths.clone();
        shuffled.shuffle(&mut rng);

        let (train_part, test_part) = shuffled.split_at(take);
        train.extend(train_part.iter().cloned().map(|path| (path, label)));
        test.extend(test_part.iter().cloned().map(|path| (path, label)));
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    (
        Split {
            target: train_target,
            entries: train,
        },
        Split {
            target: files.total() - train_target,
            entries: test,
        },
    )
}
