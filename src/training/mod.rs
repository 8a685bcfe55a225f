pub mod evaluator;
pub mod trainer;

pub use evaluator::{ConfusionMatrix, Evaluator, Metrics};
pub use trainer::{CancellationToken, EpochStats, TrainingConfig, TrainingLoop, TrainingReport};
