use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataloader::DataSetIterator;
use crate::error::ClassifierError;
use crate::model::{ArchitectureError, TrainedNetwork};

/// Square count matrix indexed by (actual, predicted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<usize>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            counts: vec![0; num_classes * num_classes],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Ignores pairs outside the matrix.
    pub fn record(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            self.counts[actual * self.num_classes + predicted] += 1;
        }
    }

    /// Zero for pairs outside the matrix, which `record` never counts.
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.counts[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|c| self.get(c, c)).sum()
    }

    fn predicted_as(&self, class: usize) -> usize {
        (0..self.num_classes).map(|a| self.get(a, class)).sum()
    }

    fn actually(&self, class: usize) -> usize {
        (0..self.num_classes).map(|p| self.get(class, p)).sum()
    }
}

/// Classification scores of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    /// Macro average over classes the model predicted at least once.
    pub precision: f64,
    /// Macro average over classes present in the data.
    pub recall: f64,
    /// Harmonic mean of `precision` and `recall`.
    pub f1: f64,
    pub num_samples: usize,
    pub confusion: ConfusionMatrix,
}

impl Metrics {
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let total = confusion.total();
        let accuracy = ratio(confusion.correct(), total);

        let macro_average = |denominator: &dyn Fn(usize) -> usize| {
            let scores: Vec<f64> = (0..confusion.num_classes())
                .filter_map(|c| {
                    let d = denominator(c);
                    (d > 0).then(|| ratio(confusion.get(c, c), d))
                })
                .collect();
            if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            }
        };
        let precision = macro_average(&|c| confusion.predicted_as(c));
        let recall = macro_average(&|c| confusion.actually(c));
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
            num_samples: total,
            confusion,
        }
    }

    /// Human-readable report with the scores and the confusion matrix.
    pub fn stats(&self) -> String {
        let mut out = String::new();
        let k = self.confusion.num_classes();
        let _ = writeln!(out, "========================== Scores ==========================");
        let _ = writeln!(out, " # of classes:    {}", k);
        let _ = writeln!(out, " # of samples:    {}", self.num_samples);
        let _ = writeln!(out, " Accuracy:        {:.4}", self.accuracy);
        let _ = writeln!(out, " Precision:       {:.4}", self.precision);
        let _ = writeln!(out, " Recall:          {:.4}", self.recall);
        let _ = writeln!(out, " F1 Score:        {:.4}", self.f1);
        let _ = writeln!(out, "====================== Confusion Matrix ====================");
        let _ = writeln!(out, " actual \\ predicted");
        for actual in 0..k {
            let row: Vec<String> = (0..k).map(|p| format!("{:>6}", self.confusion.get(actual, p))).collect();
            let _ = writeln!(out, " {:>3} |{}", actual, row.join(""));
        }
        let _ = write!(out, "============================================================");
        out
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub struct Evaluator;

impl Evaluator {
    /// Drains `data` once and scores the network's predictions. The network
    /// is only read; callers reset the iterator if they need it again.
    pub fn evaluate<I>(network: &TrainedNetwork, data: &mut I) -> Result<Metrics, ClassifierError>
    where
        I: DataSetIterator + ?Sized,
    {
        if data.num_classes() != network.num_classes() {
            return Err(ClassifierError::Step {
                stage: "evaluation",
                source: ArchitectureError::ClassCountMismatch {
                    network: network.num_classes(),
                    data: data.num_classes(),
                },
            });
        }

        let mut confusion = ConfusionMatrix::new(network.num_classes());
        for batch in &mut *data {
            let batch = batch.map_err(|source| ClassifierError::BatchLoad {
                stage: "evaluation",
                source,
            })?;
            let predicted = network
                .classify(&batch.features)
                .map_err(|source| ClassifierError::Step {
                    stage: "evaluation",
                    source,
                })?;
            for (&actual, &guess) in batch.labels.iter().zip(&predicted) {
                confusion.record(actual, guess);
            }
            debug!("Evaluated batch {} ({} samples)", batch.batch_number, batch.labels.len());
        }

        Ok(Metrics::from_confusion(confusion))
    }
}
