mod common;

use image_classifier::dataloader::{DataSetIterator, DatasetPipeline, ImageShape};
use image_classifier::model::{
    Activation, ArchitectureConfig, ArchitectureError, LayerDesc, ModelBuilder, NetworkSpec, OptimizerConfig,
    WeightInit,
};
use image_classifier::training::{CancellationToken, Evaluator, TrainingConfig, TrainingLoop};
use image_classifier::{ClassifierError, ConvolutionConfig, KernelConfig};

use common::{loader_config, small_spec, write_dataset};

fn snapshot(network: &image_classifier::TrainedNetwork) -> Vec<Vec<f32>> {
    network.parameters().iter().map(|t| t.data().to_vec()).collect()
}

#[test]
fn same_seed_builds_identical_weights() {
    let spec = small_spec(2);
    let a = ModelBuilder::build(&spec, 7);
    let b = ModelBuilder::build(&spec, 7);
    let c = ModelBuilder::build(&spec, 8);

    assert_eq!(snapshot(&a), snapshot(&b));
    assert_ne!(snapshot(&a), snapshot(&c));
}

#[test]
fn seeded_training_runs_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 12);
    let config = loader_config(dir.path(), 2, 8);
    let trainer = TrainingLoop::new(TrainingConfig {
        epochs: 2,
        evaluate_each_epoch: false,
    });

    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut train = DatasetPipeline::build(&config).unwrap().train;
        let mut network = ModelBuilder::build(&small_spec(2), 42);
        let report = trainer.train(&mut network, &mut train).unwrap();
        runs.push((report, snapshot(&network)));
    }

    assert_eq!(runs[0].0.epochs.len(), 2);
    let losses = |i: usize| runs[i].0.epochs.iter().map(|e| e.mean_loss).collect::<Vec<_>>();
    assert_eq!(losses(0), losses(1));
    assert_eq!(runs[0].1, runs[1].1);
}

#[test]
fn loss_falls_on_separable_data() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["dark", "light"], 20);
    let mut train = DatasetPipeline::build(&loader_config(dir.path(), 2, 8)).unwrap().train;

    let mut network = ModelBuilder::build(&small_spec(2), 3);
    let report = TrainingLoop::new(TrainingConfig {
        epochs: 10,
        evaluate_each_epoch: false,
    })
    .train(&mut network, &mut train)
    .unwrap();

    let first = report.epochs[0].mean_loss;
    let last = report.final_loss().unwrap();
    assert!(last < first, "loss went from {first} to {last}");
    assert!(!report.cancelled);
    assert_eq!(report.epochs[0].samples, 32);
    assert_eq!(report.epochs[0].batches, 4);
}

#[test]
fn per_epoch_evaluation_resets_the_test_iterator() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 10);
    let dataset = DatasetPipeline::build(&loader_config(dir.path(), 2, 4)).unwrap();
    let (mut train, mut test) = (dataset.train, dataset.test);

    let mut network = ModelBuilder::build(&small_spec(2), 1);
    let report = TrainingLoop::new(TrainingConfig {
        epochs: 3,
        evaluate_each_epoch: true,
    })
    .train_and_evaluate(&mut network, &mut train, &mut test)
    .unwrap();

    for stats in &report.epochs {
        let metrics = stats.test_metrics.as_ref().unwrap();
        assert_eq!(metrics.num_samples, 4);
    }
    let batches = test.num_batches();
    assert_eq!(test.count(), batches);
}

#[test]
fn mismatched_layer_sizes_fail_before_allocation() {
    let err = NetworkSpec::new(
        ImageShape::new(8, 8, 3),
        vec![
            LayerDesc::Convolution {
                kernel: KernelConfig::new(3, 1).unwrap(),
                in_channels: 1,
                out_channels: 4,
                activation: Activation::ReLU,
            },
            LayerDesc::Output {
                in_features: 144,
                num_classes: 2,
            },
        ],
        OptimizerConfig::default(),
        WeightInit::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ArchitectureError::ChannelMismatch { layer: 0, expected: 1, actual: 3 }));

    let err = NetworkSpec::convolutional(
        ImageShape::new(6, 6, 3),
        &ConvolutionConfig::default(),
        &ArchitectureConfig::default(),
        10,
        OptimizerConfig::default(),
        WeightInit::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ArchitectureError::KernelTooLarge { .. }));
}

#[test]
fn class_count_mismatch_aborts_training_without_updates() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 5);
    let mut train = DatasetPipeline::build(&loader_config(dir.path(), 2, 4)).unwrap().train;

    let mut network = ModelBuilder::build(&small_spec(3), 5);
    let before = snapshot(&network);
    let err = TrainingLoop::new(TrainingConfig::default())
        .train(&mut network, &mut train)
        .unwrap_err();

    assert!(matches!(
        err,
        ClassifierError::Step {
            source: ArchitectureError::ClassCountMismatch { network: 3, data: 2 },
            ..
        }
    ));
    assert_eq!(snapshot(&network), before);
    assert_eq!(network.iteration(), 0);
}

#[test]
fn evaluation_leaves_the_network_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 10);
    let mut test = DatasetPipeline::build(&loader_config(dir.path(), 2, 3)).unwrap().test;

    let network = ModelBuilder::build(&small_spec(2), 9);
    let before = snapshot(&network);

    let first = Evaluator::evaluate(&network, &mut test).unwrap();
    test.reset();
    let second = Evaluator::evaluate(&network, &mut test).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.num_samples, 4);
    assert_eq!(first.confusion.total(), 4);
    assert_eq!(snapshot(&network), before);
    assert_eq!(network.iteration(), 0);
}

#[test]
fn cancellation_stops_after_the_current_step() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 10);
    let mut train = DatasetPipeline::build(&loader_config(dir.path(), 2, 4)).unwrap().train;

    let token = CancellationToken::new();
    token.cancel();
    let mut network = ModelBuilder::build(&small_spec(2), 2);
    let report = TrainingLoop::new(TrainingConfig {
        epochs: 5,
        evaluate_each_epoch: false,
    })
    .with_cancellation(token)
    .train(&mut network, &mut train)
    .unwrap();

    assert!(report.cancelled);
    assert!(report.epochs.is_empty());
    assert_eq!(network.iteration(), 1);
    // The iterator was rewound for the next caller.
    assert_eq!(train.count(), 4);
}

#[test]
fn dense_only_network_trains_on_flattened_images() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 6);
    let mut train = DatasetPipeline::build(&loader_config(dir.path(), 2, 5)).unwrap().train;

    let features = common::SIDE * common::SIDE * 3;
    let spec = NetworkSpec::new(
        ImageShape::new(common::SIDE, common::SIDE, 3),
        vec![
            LayerDesc::Dense {
                in_features: features,
                out_features: 8,
                activation: Activation::Tanh,
            },
            LayerDesc::Output {
                in_features: 8,
                num_classes: 2,
            },
        ],
        OptimizerConfig::default(),
        WeightInit::Xavier,
    )
    .unwrap();
    let mut network = ModelBuilder::build(&spec, 11);
    let report = TrainingLoop::new(TrainingConfig {
        epochs: 1,
        evaluate_each_epoch: false,
    })
    .train(&mut network, &mut train)
    .unwrap();

    assert_eq!(report.epochs[0].samples, 10);
    assert_eq!(network.iteration(), 2);
}
