use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::DatasetError;

/// Geometry every decoded image is brought to before batching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl ImageShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    pub fn pixels_per_image(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl std::fmt::Display for ImageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}×{}", self.height, self.width, self.channels)
    }
}

/// Which raw range the scaler maps onto its output bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalingMode {
    /// Full 8-bit pixel domain, [0, 255].
    #[default]
    PixelDomain,
    /// Smallest and largest raw values seen while fitting.
    Observed,
}

#[derive(Debug, Clone)]
pub struct DataLoaderConfig {
    pub root_dir: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub seed: u64,
    pub train_percent: u32,
    pub test_percent: u32,
    pub batch_size: usize,
    pub num_classes: usize,
    pub image_shape: ImageShape,
    pub normalization_min: f32,
    pub normalization_max: f32,
    pub scaling: ScalingMode,
    pub threads: usize,
}

impl DataLoaderConfig {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    pub fn build(self) -> Result<Self, DatasetError> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        check_split_percentages(self.train_percent, self.test_percent)?;

        if self.batch_size == 0 {
            return Err(DatasetError::InvalidBatchSize);
        }

        let (min, max) = (self.normalization_min, self.normalization_max);
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(DatasetError::InvalidNormalization { min, max });
        }

        let shape = self.image_shape;
        if shape.height == 0 || shape.width == 0 || !matches!(shape.channels, 1 | 3 | 4) {
            return Err(DatasetError::UnsupportedImageShape {
                height: shape.height,
                width: shape.width,
                channels: shape.channels,
            });
        }

        Ok(())
    }

    pub(crate) fn normalized_extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect()
    }
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("cifar"),
            allowed_extensions: vec!["png".to_string()],
            seed: 666,
            train_percent: 80,
            test_percent: 20,
            batch_size: 240,
            num_classes: 10,
            image_shape: ImageShape::new(32, 32, 3),
            normalization_min: 0.0,
            normalization_max: 1.0,
            scaling: ScalingMode::PixelDomain,
            threads: num_cpus::get(),
        }
    }
}

fn check_split_percentages(train: u32, test: u32) -> Result<(), DatasetError> {
    if train.checked_add(test) != Some(100) {
        return Err(DatasetError::InvalidSplit { train, test });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_must_sum_to_hundred() {
        let config = DataLoaderConfig {
            train_percent: 70,
            test_percent: 20,
            ..Default::default()
        };
        let err = config.build().err().unwrap();
        assert_eq!(err.reason(), "invalid-split");
    }

    #[test]
    fn normalization_bounds_must_be_finite_and_ordered() {
        for (min, max) in [(1.0, 0.0), (0.5, 0.5), (f32::NAN, 1.0), (0.0, f32::INFINITY)] {
            let config = DataLoaderConfig {
                normalization_min: min,
                normalization_max: max,
                ..Default::default()
            };
            let err = config.build().err().unwrap();
            assert_eq!(err.reason(), "invalid-normalization");
        }

        let config = DataLoaderConfig {
            normalization_min: -1.0,
            normalization_max: 1.0,
            ..Default::default()
        };
        assert!(config.build().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = DataLoaderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(DatasetError::InvalidBatchSize)));
    }

    #[test]
    fn two_channel_images_are_rejected() {
        let config = DataLoaderConfig {
            image_shape: ImageShape::new(8, 8, 2),
            ..Default::default()
        };
        assert!(matches!(
            config.build(),
            Err(DatasetError::UnsupportedImageShape { channels: 2, .. })
        ));
    }

    #[test]
    fn extensions_are_normalized() {
        let config = DataLoaderConfig {
            allowed_extensions: vec![".PNG".into(), "jpg".into()],
            ..Default::default()
        };
        assert_eq!(config.normalized_extensions(), vec!["png", "jpg"]);
    }
}
