use tracing::{debug, info};

use crate::dataloader::DataBatch;
use crate::layer::Layer;
use crate::tensor::{Tensor, TensorDesc};

use super::error::ArchitectureError;
use super::loss::{softmax, softmax_cross_entropy};
use super::network_spec::NetworkSpec;
use super::optimizer::OptimizerState;

/// Result of one optimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub loss: f32,
    pub samples: usize,
    pub learning_rate: f32,
}

/// A materialized network: weights for every layer of its spec plus the
/// optimizer state needed to continue training.
pub struct TrainedNetwork {
    spec: NetworkSpec,
    stages: Vec<Box<dyn Layer>>,
    optimizer: OptimizerState,
}

impl TrainedNetwork {
    pub(crate) fn from_parts(spec: NetworkSpec, stages: Vec<Box<dyn Layer>>, optimizer: OptimizerState) -> Self {
        Self {
            spec,
            stages,
            optimizer,
        }
    }

    pub fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    /// Executable layers, including the activation and flatten steps the spec implies.
    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.stages
    }

    pub fn optimizer_state(&self) -> &OptimizerState {
        &self.optimizer
    }

    /// Every parameter tensor in layer order, weights before biases.
    pub fn parameters(&self) -> Vec<&Tensor> {
        self.stages.iter().flat_map(|s| s.parameters()).collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.stages.iter().map(|s| s.parameter_count()).sum()
    }

    pub fn num_classes(&self) -> usize {
        self.spec.num_classes()
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.current_learning_rate(self.spec.optimizer())
    }

    pub fn iteration(&self) -> u64 {
        self.optimizer.iteration
    }

    fn check_input(&self, features: &Tensor) -> Result<(), ArchitectureError> {
        let input = self.spec.input();
        match *features.desc() {
            TensorDesc::Tensor4D {
                channels,
                height,
                width,
                ..
            } if channels == input.channels && height == input.height && width == input.width => Ok(()),
            actual => Err(ArchitectureError::InputMismatch {
                layer: "Network".to_string(),
                expected: format!("N×{}×{}×{}", input.channels, input.height, input.width),
                actual,
            }),
        }
    }

    fn forward_all(&self, features: &Tensor) -> Result<Vec<Tensor>, ArchitectureError> {
        self.check_input(features)?;
        let mut outputs: Vec<Tensor> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let input = outputs.last().unwrap_or(features);
            let output = stage.forward(input)?;
            outputs.push(output);
        }
        Ok(outputs)
    }

    /// Raw class scores, N×num_classes.
    pub fn forward(&self, features: &Tensor) -> Result<Tensor, ArchitectureError> {
        let mut outputs = self.forward_all(features)?;
        outputs.pop().ok_or(ArchitectureError::EmptyNetwork)
    }

    /// Class probabilities, N×num_classes, rows summing to one.
    pub fn predict(&self, features: &Tensor) -> Result<Tensor, ArchitectureError> {
        softmax(&self.forward(features)?)
    }

    /// Most probable class per sample.
    pub fn classify(&self, features: &Tensor) -> Result<Vec<usize>, ArchitectureError> {
        Ok(self.forward(features)?.argmax_rows())
    }

    /// One forward, backward and update over `batch`.
    ///
    /// All gradients are computed before any weight changes, so a failed
    /// step leaves the network as it was.
    pub fn fit_batch(&mut self, batch: &DataBatch) -> Result<StepOutcome, ArchitectureError> {
        if batch.num_classes != self.num_classes() {
            return Err(ArchitectureError::ClassCountMismatch {
                network: self.num_classes(),
                data: batch.num_classes,
            });
        }

        let features = &batch.features;
        let outputs = self.forward_all(features)?;
        let logits = outputs.last().ok_or(ArchitectureError::EmptyNetwork)?;
        let (loss, mut grad) = softmax_cross_entropy(logits, &batch.labels)?;

        let mut parameter_grads: Vec<Vec<Tensor>> = Vec::with_capacity(self.stages.len());
        for (i, stage) in self.stages.iter().enumerate().rev() {
            let input = if i == 0 { features } else { &outputs[i - 1] };
            let grads = stage.backward(input, &outputs[i], &grad)?;
            grad = grads.input;
            parameter_grads.push(grads.parameters);
        }
        parameter_grads.reverse();

        self.optimizer.check_slots(self.stages.iter().flat_map(|s| s.parameters()))?;
        let config = *self.spec.optimizer();
        let learning_rate = self.optimizer.begin_step(&config);
        let mut slot = 0;
        for (stage, grads) in self.stages.iter_mut().zip(&parameter_grads) {
            for (param, grad) in stage.parameters_mut().iter_mut().zip(grads) {
                self.optimizer.update(&config, slot, param, grad)?;
                slot += 1;
            }
        }
        self.optimizer.finish_step();

        debug!(
            "Iteration {} batch {}: loss {:.5}, lr {:.6}",
            self.optimizer.iteration, batch.batch_number, loss, learning_rate
        );

        Ok(StepOutcome {
            loss,
            samples: batch.samples_in_batch(),
            learning_rate,
        })
    }

    /// Feeds an epoch's mean loss to the learning rate schedule.
    pub fn end_epoch(&mut self, mean_loss: f32) -> f32 {
        let config = *self.spec.optimizer();
        self.optimizer.end_epoch(&config, mean_loss)
    }

    pub fn log_summary(&self) {
        info!("Network ({} parameters):", self.parameter_count());
        for (i, stage) in self.stages.iter().enumerate() {
            match stage.config_string() {
                Some(config) => info!("  {:>2}: {} ({})", i, stage.name(), config),
                None => info!("  {:>2}: {}", i, stage.name()),
            }
        }
    }
}

impl std::fmt::Debug for TrainedNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainedNetwork")
            .field("spec", &self.spec)
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("iteration", &self.optimizer.iteration)
            .finish()
    }
}
