mod common;

use std::fs;

use image_classifier::dataloader::{DataSetIterator, DatasetError, DatasetPipeline, ScalingMode};

use common::{loader_config, write_dataset};

#[test]
fn two_labels_split_eighty_twenty_into_batches_of_ten() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["cat", "dog"], 100);

    let config = image_classifier::DataLoaderConfig {
        seed: 1,
        ..loader_config(dir.path(), 2, 10)
    };
    let dataset = DatasetPipeline::build(&config).unwrap();

    assert_eq!(dataset.label_names, vec!["cat".to_string(), "dog".to_string()]);
    assert_eq!(dataset.info.train_size, 160);
    assert_eq!(dataset.info.test_size, 40);
    assert_eq!(dataset.info.train_label_counts, vec![80, 80]);
    assert_eq!(dataset.info.test_label_counts, vec![20, 20]);
    assert_eq!(dataset.train.num_batches(), 16);
    assert_eq!(dataset.test.num_batches(), 4);

    let batches: Vec<_> = dataset.train.map(Result::unwrap).collect();
    assert_eq!(batches.len(), 16);
    assert!(batches.iter().all(|b| b.samples_in_batch() == 10));
    assert_eq!(batches[0].features.desc().to_dims(), vec![10, 3, common::SIDE, common::SIDE]);
}

#[test]
fn uneven_labels_stay_within_one_sample_of_proportional() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b", "c"], 7);
    write_dataset(dir.path(), &["d"], 13);

    let dataset = DatasetPipeline::build(&loader_config(dir.path(), 4, 5)).unwrap();
    let info = &dataset.info;

    assert_eq!(info.total_size(), 34);
    assert_eq!(info.train_size, (34 * 80 + 50) / 100);
    for (label, (&train, &test)) in info.train_label_counts.iter().zip(&info.test_label_counts).enumerate() {
        let n = train + test;
        let ideal = n as f64 * 0.8;
        assert!((train as f64 - ideal).abs() <= 1.0, "label {label}: {train} of {n}");
    }

    // 27 train and 7 test samples in batches of five
    assert_eq!(dataset.train.num_batches(), 6);
    assert_eq!(dataset.test.num_batches(), 2);
    for (split, expected) in [(dataset.train, vec![5, 5, 5, 5, 5, 2]), (dataset.test, vec![5, 2])] {
        let num_batches = split.num_batches();
        let sizes: Vec<_> = split.map(|b| b.unwrap().samples_in_batch()).collect();
        assert_eq!(sizes.len(), num_batches);
        assert_eq!(sizes, expected);
    }
}

#[test]
fn features_respect_normalization_bounds() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 10);

    for scaling in [ScalingMode::PixelDomain, ScalingMode::Observed] {
        let config = image_classifier::DataLoaderConfig {
            normalization_min: -1.0,
            normalization_max: 1.0,
            scaling,
            ..loader_config(dir.path(), 2, 4)
        };
        let dataset = DatasetPipeline::build(&config).unwrap();
        for batch in dataset.train.chain(dataset.test) {
            let batch = batch.unwrap();
            assert!(batch.features.data().iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }
}

#[test]
fn observed_scaling_reaches_both_bounds() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 10);

    let config = image_classifier::DataLoaderConfig {
        scaling: ScalingMode::Observed,
        ..loader_config(dir.path(), 2, 20)
    };
    let dataset = DatasetPipeline::build(&config).unwrap();
    let (lo, hi) = dataset.info.observed_range.unwrap();
    assert!(lo < hi);

    let values: Vec<f32> = dataset
        .train
        .chain(dataset.test)
        .flat_map(|b| b.unwrap().features.into_data())
        .collect();
    let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    assert_eq!(min, 0.0);
    assert_eq!(max, 1.0);
}

#[test]
fn reset_replays_identical_batches() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b", "c"], 9);

    let mut train = DatasetPipeline::build(&loader_config(dir.path(), 3, 4)).unwrap().train;
    let first: Vec<_> = (&mut train).map(Result::unwrap).collect();
    assert!(train.next().is_none());

    train.reset();
    let second: Vec<_> = (&mut train).map(Result::unwrap).collect();
    assert_eq!(first, second);
}

#[test]
fn same_seed_gives_same_order() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 12);

    let config = loader_config(dir.path(), 2, 6);
    let a: Vec<_> = DatasetPipeline::build(&config).unwrap().train.map(|b| b.unwrap().labels).collect();
    let b: Vec<_> = DatasetPipeline::build(&config).unwrap().train.map(|b| b.unwrap().labels).collect();
    assert_eq!(a, b);
}

#[test]
fn prefetch_yields_the_same_batches() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 15);

    let dataset = DatasetPipeline::build(&loader_config(dir.path(), 2, 4)).unwrap();
    let mut prefetched = dataset.train.prefetch(2);
    let expected: Vec<_> = dataset.train.map(Result::unwrap).collect();

    let first: Vec<_> = (&mut prefetched).map(Result::unwrap).collect();
    assert_eq!(first, expected);

    prefetched.reset();
    let second: Vec<_> = (&mut prefetched).map(Result::unwrap).collect();
    assert_eq!(second, expected);
}

#[test]
fn dropping_a_partially_read_prefetch_iterator_does_not_hang() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 20);

    let dataset = DatasetPipeline::build(&loader_config(dir.path(), 2, 2)).unwrap();
    let mut prefetched = dataset.train.prefetch(1);
    assert!(prefetched.next().unwrap().is_ok());
    drop(prefetched);
}

#[test]
fn missing_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = DatasetPipeline::build(&loader_config(&dir.path().join("absent"), 2, 10))
        .err()
        .unwrap();
    assert!(matches!(err, DatasetError::MissingDirectory(_)));
    assert_eq!(err.reason(), "missing-or-not-a-directory");
}

#[test]
fn split_that_does_not_sum_to_hundred_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a"], 2);

    let config = image_classifier::DataLoaderConfig {
        train_percent: 70,
        test_percent: 20,
        ..loader_config(dir.path(), 1, 10)
    };
    let err = DatasetPipeline::build(&config).err().unwrap();
    assert!(matches!(err, DatasetError::InvalidSplit { train: 70, test: 20 }));
}

#[test]
fn undecodable_image_fails_the_build() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), &["a", "b"], 3);
    fs::write(dir.path().join("a").join("broken.png"), b"not a png").unwrap();

    let err = DatasetPipeline::build(&loader_config(dir.path(), 2, 2)).err().unwrap();
    assert_eq!(err.reason(), "decode");
}
