use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dataloader::{DataLoaderConfig, ImageShape, ScalingMode};
use crate::model::{
    ArchitectureConfig, ArchitectureError, LearningRatePolicy, NetworkSpec, OptimizerConfig, WeightInit,
};
use crate::training::TrainingConfig;

use super::kernel_config::ConvolutionConfig;

/// Process-wide parameters of a classification run. Every field may be
/// omitted from the JSON resource and falls back to its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    pub image_height: usize,
    pub image_width: usize,
    pub image_channels: usize,
    pub num_classes: usize,
    pub seed: u64,
    pub train_percent: u32,
    pub test_percent: u32,
    pub batch_size: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub learning_rate_policy: LearningRatePolicy,
    pub momentum: f32,
    pub l2: f32,
    pub weight_init: WeightInit,
    pub architecture: ArchitectureConfig,
    pub allowed_extensions: Vec<String>,
    pub normalization_min: f32,
    pub normalization_max: f32,
    pub scaling: ScalingMode,
    /// Batches decoded ahead of the training thread. 0 disables prefetching.
    pub prefetch: usize,
    pub threads: usize,
    pub evaluate_each_epoch: bool,
    pub model_path: PathBuf,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let optimizer = OptimizerConfig::default();
        Self {
            image_height: 32,
            image_width: 32,
            image_channels: 3,
            num_classes: 10,
            seed: 666,
            train_percent: 80,
            test_percent: 20,
            batch_size: 240,
            epochs: 20,
            learning_rate: optimizer.learning_rate,
            learning_rate_policy: optimizer.policy,
            momentum: optimizer.momentum,
            l2: optimizer.l2,
            weight_init: WeightInit::default(),
            architecture: ArchitectureConfig::default(),
            allowed_extensions: vec!["png".to_string()],
            normalization_min: 0.0,
            normalization_max: 1.0,
            scaling: ScalingMode::PixelDomain,
            prefetch: 2,
            threads: num_cpus::get(),
            evaluate_each_epoch: false,
            model_path: PathBuf::from("cifar-network.bin"),
        }
    }
}

impl ClassifierConfig {
    pub fn image_shape(&self) -> ImageShape {
        ImageShape::new(self.image_height, self.image_width, self.image_channels)
    }

    pub fn dataloader_config(&self, root_dir: impl Into<PathBuf>) -> DataLoaderConfig {
        DataLoaderConfig {
            root_dir: root_dir.into(),
            allowed_extensions: self.allowed_extensions.clone(),
            seed: self.seed,
            train_percent: self.train_percent,
            test_percent: self.test_percent,
            batch_size: self.batch_size,
            num_classes: self.num_classes,
            image_shape: self.image_shape(),
            normalization_min: self.normalization_min,
            normalization_max: self.normalization_max,
            scaling: self.scaling,
            threads: self.threads.max(1),
        }
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            learning_rate: self.learning_rate,
            momentum: self.momentum,
            l2: self.l2,
            policy: self.learning_rate_policy,
        }
    }

    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.epochs,
            evaluate_each_epoch: self.evaluate_each_epoch,
        }
    }

    /// The conv-pool-conv-pool-dense network for this run's image geometry
    /// and class count.
    pub fn network_spec(&self, kernels: &ConvolutionConfig) -> Result<NetworkSpec, ArchitectureError> {
        NetworkSpec::convolutional(
            self.image_shape(),
            kernels,
            &self.architecture,
            self.num_classes,
            self.optimizer_config(),
            self.weight_init,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_json;

    #[test]
    fn empty_resource_yields_defaults() {
        let config: ClassifierConfig = parse_json("classifier.json", "{}").unwrap();
        assert_eq!(config, ClassifierConfig {
            threads: config.threads,
            ..Default::default()
        });
        assert_eq!(config.batch_size, 240);
        assert_eq!(config.model_path, PathBuf::from("cifar-network.bin"));
    }

    #[test]
    fn partial_resource_overrides_named_fields() {
        let json = r#"{
            "batchSize": 10,
            "epochs": 3,
            "learningRatePolicy": {"step": {"gamma": 0.5, "steps": 100}},
            "architecture": {"firstDenseFeatures": 32, "secondDenseFeatures": null}
        }"#;
        let config: ClassifierConfig = parse_json("classifier.json", json).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.training_config().epochs, 3);
        assert_eq!(
            config.optimizer_config().policy,
            LearningRatePolicy::Step { gamma: 0.5, steps: 100 }
        );
        assert_eq!(config.architecture.first_dense_features, 32);
        assert_eq!(config.architecture.second_dense_features, None);
        assert_eq!(config.architecture.first_conv_channels, 64);
    }

    #[test]
    fn dataloader_config_carries_geometry_and_split() {
        let config = ClassifierConfig {
            image_height: 8,
            image_width: 6,
            image_channels: 1,
            threads: 0,
            ..Default::default()
        };
        let loader = config.dataloader_config("data");
        assert_eq!(loader.root_dir, PathBuf::from("data"));
        assert_eq!(loader.image_shape, ImageShape::new(8, 6, 1));
        assert_eq!((loader.train_percent, loader.test_percent), (80, 20));
        assert_eq!(loader.threads, 1);
        assert!(loader.build().is_ok());
    }

    #[test]
    fn default_network_spec_ends_in_class_count() {
        let config = ClassifierConfig::default();
        let spec = config.network_spec(&ConvolutionConfig::default()).unwrap();
        assert_eq!(spec.num_classes(), 10);
        assert_eq!(spec.input(), config.image_shape());
    }
}
