use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataloader::DataSetIterator;
use crate::error::ClassifierError;
use crate::model::{ArchitectureError, TrainedNetwork};

use super::evaluator::{Evaluator, Metrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub evaluate_each_epoch: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            evaluate_each_epoch: false,
        }
    }
}

/// Shared flag for stopping a run from another thread. Checked after every
/// completed optimizer step.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-epoch training statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 0-based epoch index.
    pub epoch: usize,
    /// Sample-weighted mean training loss.
    pub mean_loss: f32,
    pub batches: usize,
    pub samples: usize,
    /// Learning rate in effect for the epoch's last step.
    pub learning_rate: f32,
    pub elapsed_ms: u64,
    pub test_metrics: Option<Metrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochStats>,
    pub cancelled: bool,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epochs.last().map(|e| e.mean_loss)
    }
}

pub struct TrainingLoop {
    config: TrainingConfig,
    cancel: Option<CancellationToken>,
}

impl TrainingLoop {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config, cancel: None }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Runs `epochs` full passes over `train`, resetting it after each one.
    pub fn train<I>(&self, network: &mut TrainedNetwork, train: &mut I) -> Result<TrainingReport, ClassifierError>
    where
        I: DataSetIterator + ?Sized,
    {
        self.run(network, train, None::<&mut I>)
    }

    /// Like [`TrainingLoop::train`], also scoring `test` after every epoch
    /// when `evaluate_each_epoch` is set.
    pub fn train_and_evaluate<I, J>(
        &self,
        network: &mut TrainedNetwork,
        train: &mut I,
        test: &mut J,
    ) -> Result<TrainingReport, ClassifierError>
    where
        I: DataSetIterator + ?Sized,
        J: DataSetIterator + ?Sized,
    {
        let test = self.config.evaluate_each_epoch.then_some(test);
        self.run(network, train, test)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn run<I, J>(
        &self,
        network: &mut TrainedNetwork,
        train: &mut I,
        mut test: Option<&mut J>,
    ) -> Result<TrainingReport, ClassifierError>
    where
        I: DataSetIterator + ?Sized,
        J: DataSetIterator + ?Sized,
    {
        if train.num_classes() != network.num_classes() {
            return Err(ClassifierError::Step {
                stage: "training",
                source: ArchitectureError::ClassCountMismatch {
                    network: network.num_classes(),
                    data: train.num_classes(),
                },
            });
        }

        let mut report = TrainingReport::default();
        info!(
            "Training for {} epochs, {} batches per epoch",
            self.config.epochs,
            train.num_batches()
        );

        for epoch in 0..self.config.epochs {
            let started = Instant::now();
            let mut loss_sum = 0.0f64;
            let mut samples = 0usize;
            let mut batches = 0usize;
            let mut learning_rate = network.learning_rate();

            for batch in &mut *train {
                let batch = batch.map_err(|source| ClassifierError::BatchLoad {
                    stage: "training",
                    source,
                })?;
                let step = network.fit_batch(&batch).map_err(|source| ClassifierError::Step {
                    stage: "training",
                    source,
                })?;

                loss_sum += step.loss as f64 * step.samples as f64;
                samples += step.samples;
                batches += 1;
                learning_rate = step.learning_rate;

                if self.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
            }
            train.reset();

            if report.cancelled {
                warn!("Training cancelled during epoch {} after {} batches", epoch, batches);
                break;
            }

            let mean_loss = if samples > 0 { (loss_sum / samples as f64) as f32 } else { 0.0 };
            let next_rate = network.end_epoch(mean_loss);

            let test_metrics = match test.as_deref_mut() {
                Some(test) => {
                    let metrics = Evaluator::evaluate(network, test);
                    test.reset();
                    Some(metrics?)
                }
                None => None,
            };

            let stats = EpochStats {
                epoch,
                mean_loss,
                batches,
                samples,
                learning_rate,
                elapsed_ms: started.elapsed().as_millis() as u64,
                test_metrics,
            };
            match &stats.test_metrics {
                Some(m) => info!(
                    "Completed epoch {}: loss {:.5}, lr {:.6} → {:.6}, test accuracy {:.4}, {} ms",
                    epoch, mean_loss, learning_rate, next_rate, m.accuracy, stats.elapsed_ms
                ),
                None => info!(
                    "Completed epoch {}: loss {:.5}, lr {:.6} → {:.6}, {} ms",
                    epoch, mean_loss, learning_rate, next_rate, stats.elapsed_ms
                ),
            }
            report.epochs.push(stats);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn training_config_defaults_missing_fields() {
        let config: TrainingConfig = serde_json::from_str(r#"{"evaluateEachEpoch": true}"#).unwrap();
        assert_eq!(config.epochs, 20);
        assert!(config.evaluate_each_epoch);
    }
}
