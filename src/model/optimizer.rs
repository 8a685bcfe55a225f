use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

use super::error::ArchitectureError;

/// How the learning rate evolves over training.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LearningRatePolicy {
    #[default]
    None,
    /// `base * gamma^iteration`
    Exponential { gamma: f32 },
    /// `base / (1 + gamma * iteration)^power`
    Inverse { gamma: f32, power: f32 },
    /// `base * gamma^(iteration / steps)`
    Step { gamma: f32, steps: u64 },
    /// Multiplies the rate by `1 - decay_rate` after every epoch whose mean
    /// loss fails to improve on the best seen so far.
    #[serde(rename_all = "camelCase")]
    Score { decay_rate: f32 },
}

impl LearningRatePolicy {
    fn scheduled_rate(&self, base: f32, current: f32, iteration: u64) -> f32 {
        match *self {
            LearningRatePolicy::None | LearningRatePolicy::Score { .. } => current,
            LearningRatePolicy::Exponential { gamma } => base * gamma.powf(iteration as f32),
            LearningRatePolicy::Inverse { gamma, power } => {
                base / (1.0 + gamma * iteration as f32).powf(power)
            }
            LearningRatePolicy::Step { gamma, steps } => {
                base * gamma.powf((iteration / steps.max(1)) as f32)
            }
        }
    }
}

/// Nesterov momentum SGD with L2 weight decay.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerConfig {
    pub learning_rate: f32,
    pub momentum: f32,
    pub l2: f32,
    pub policy: LearningRatePolicy,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            momentum: 0.9,
            l2: 1e-4,
            policy: LearningRatePolicy::Score { decay_rate: 1e-3 },
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ArchitectureError> {
        let checks: [(&'static str, f32, bool); 3] = [
            ("learningRate", self.learning_rate, self.learning_rate > 0.0),
            ("momentum", self.momentum, (0.0..1.0).contains(&self.momentum)),
            ("l2", self.l2, self.l2 >= 0.0),
        ];
        for (name, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(ArchitectureError::InvalidHyperparameter { name, value });
            }
        }

        let policy_value = match self.policy {
            LearningRatePolicy::Score { decay_rate } if !(0.0..1.0).contains(&decay_rate) => Some(decay_rate),
            LearningRatePolicy::Exponential { gamma }
            | LearningRatePolicy::Inverse { gamma, .. }
            | LearningRatePolicy::Step { gamma, .. }
                if gamma < 0.0 =>
            {
                Some(gamma)
            }
            _ => None,
        };
        match policy_value {
            Some(value) => Err(ArchitectureError::InvalidHyperparameter {
                name: "learningRatePolicy",
                value,
            }),
            None => Ok(()),
        }
    }
}

/// Mutable optimizer state, saved alongside the weights.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub velocities: Vec<Tensor>,
    pub iteration: u64,
    pub learning_rate: f32,
    pub best_score: Option<f32>,
}

impl OptimizerState {
    pub fn new(config: &OptimizerConfig, parameters: &[&Tensor]) -> Self {
        Self {
            velocities: parameters.iter().map(|p| Tensor::zeros(*p.desc())).collect(),
            iteration: 0,
            learning_rate: config.learning_rate,
            best_score: None,
        }
    }

    /// Rate that the next call to [`OptimizerState::begin_step`] will use.
    pub fn current_learning_rate(&self, config: &OptimizerConfig) -> f32 {
        config
            .policy
            .scheduled_rate(config.learning_rate, self.learning_rate, self.iteration)
    }

    /// Fixes the learning rate for one iteration and returns it.
    pub fn begin_step(&mut self, config: &OptimizerConfig) -> f32 {
        self.learning_rate = self.current_learning_rate(config);
        self.learning_rate
    }

    pub fn finish_step(&mut self) {
        self.iteration += 1;
    }

    /// Applies one Nesterov update to `param` using velocity slot `index`.
    ///
    /// `v' = mu * v - lr * g` then `param += -mu * v + (1 + mu) * v'`.
    /// L2 is added to the gradient of rank > 1 tensors only.
    pub fn update(
        &mut self,
        config: &OptimizerConfig,
        index: usize,
        param: &mut Tensor,
        grad: &Tensor,
    ) -> Result<(), ArchitectureError> {
        let lr = self.learning_rate;
        let mu = config.momentum;
        let l2 = if param.desc().rank() > 1 { config.l2 } else { 0.0 };

        let velocity = match self.velocities.get_mut(index) {
            Some(v) if v.desc() == param.desc() && grad.desc() == param.desc() => v,
            _ => return Err(ArchitectureError::OptimizerSlotMismatch { index }),
        };

        param
            .data_mut()
            .par_iter_mut()
            .zip(velocity.data_mut().par_iter_mut())
            .zip(grad.data().par_iter())
            .for_each(|((w, v), &g)| {
                let g = g + l2 * *w;
                let v_prev = *v;
                *v = mu * *v - lr * g;
                *w += -mu * v_prev + (1.0 + mu) * *v;
            });
        Ok(())
    }

    /// Fails unless there is exactly one velocity slot per parameter, each of
    /// the same shape.
    pub fn check_slots<'a>(&self, params: impl IntoIterator<Item = &'a Tensor>) -> Result<(), ArchitectureError> {
        let mut count = 0;
        for (index, param) in params.into_iter().enumerate() {
            match self.velocities.get(index) {
                Some(v) if v.desc() == param.desc() => count += 1,
                _ => return Err(ArchitectureError::OptimizerSlotMismatch { index }),
            }
        }
        if count != self.velocities.len() {
            return Err(ArchitectureError::OptimizerSlotMismatch { index: count });
        }
        Ok(())
    }

    /// Epoch-end hook for score-driven schedules. Returns the rate for the next epoch.
    pub fn end_epoch(&mut self, config: &OptimizerConfig, mean_loss: f32) -> f32 {
        let improved = match self.best_score {
            Some(best) => mean_loss < best,
            None => true,
        };
        if improved {
            self.best_score = Some(mean_loss);
        } else if let LearningRatePolicy::Score { decay_rate } = config.policy {
            self.learning_rate *= 1.0 - decay_rate;
        }
        self.current_learning_rate(config)
    }
}
