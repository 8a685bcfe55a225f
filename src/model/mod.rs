pub mod builder;
pub mod error;
pub mod layer_desc;
pub mod layer_shape;
pub mod loss;
pub mod network;
pub mod network_spec;
pub mod optimizer;
pub mod weight_init;

pub use builder::ModelBuilder;
pub use error::ArchitectureError;
pub use layer_desc::{Activation, LayerDesc};
pub use layer_shape::LayerShape;
pub use network::{StepOutcome, TrainedNetwork};
pub use network_spec::{ArchitectureConfig, InputShape, NetworkSpec};
pub use optimizer::{LearningRatePolicy, OptimizerConfig, OptimizerState};
pub use weight_init::WeightInit;
