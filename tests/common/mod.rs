#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use image_classifier::dataloader::{DataLoaderConfig, ImageShape};
use image_classifier::model::{ArchitectureConfig, NetworkSpec, OptimizerConfig, WeightInit};
use image_classifier::ConvolutionConfig;

pub const SIDE: usize = 16;

/// Writes `per_label` PNGs for each of `labels` under `root/<label>/`. Each
/// label gets its own base brightness so a small network can separate them.
pub fn write_dataset(root: &Path, labels: &[&str], per_label: usize) {
    for (index, label) in labels.iter().enumerate() {
        let dir = root.join(label);
        fs::create_dir_all(&dir).unwrap();
        let base = 30 + (index as u32 * 160 / labels.len().max(1) as u32);
        for i in 0..per_label {
            let img = RgbImage::from_fn(SIDE as u32, SIDE as u32, |x, y| {
                let v = (base + (i as u32 * 7 + x * 3 + y * 5) % 40).min(255) as u8;
                Rgb([v, v / 2, 255 - v])
            });
            img.save(dir.join(format!("{label}_{i:03}.png"))).unwrap();
        }
    }
}

pub fn loader_config(root: &Path, num_classes: usize, batch_size: usize) -> DataLoaderConfig {
    DataLoaderConfig {
        batch_size,
        num_classes,
        image_shape: ImageShape::new(SIDE, SIDE, 3),
        threads: 2,
        ..DataLoaderConfig::new(root)
    }
}

/// A network small enough to train in a test on `SIDE`×`SIDE` RGB input.
pub fn small_spec(num_classes: usize) -> NetworkSpec {
    let architecture = ArchitectureConfig {
        first_conv_channels: 4,
        second_conv_channels: 4,
        first_dense_features: 16,
        second_dense_features: None,
        ..Default::default()
    };
    let optimizer = OptimizerConfig {
        learning_rate: 0.05,
        ..Default::default()
    };
    NetworkSpec::convolutional(
        ImageShape::new(SIDE, SIDE, 3),
        &ConvolutionConfig::default(),
        &architecture,
        num_classes,
        optimizer,
        WeightInit::He,
    )
    .unwrap()
}
