use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::layer::{Layer, Layers};

use super::network::TrainedNetwork;
use super::network_spec::NetworkSpec;
use super::optimizer::OptimizerState;

pub struct ModelBuilder;

impl ModelBuilder {
    /// Allocates and initializes a network for `spec`.
    ///
    /// Weight tensors are drawn from a single `StdRng` seeded with `seed`, in
    /// layer order; biases start at zero.
    pub fn build(spec: &NetworkSpec, seed: u64) -> TrainedNetwork {
        let mut stages = Self::materialize(spec);
        let mut rng = StdRng::seed_from_u64(seed);
        let weight_init = spec.weight_init();

        for stage in stages.iter_mut() {
            for param in stage.parameters_mut() {
                if param.desc().rank() < 2 {
                    continue;
                }
                let values = weight_init.init(&param.desc().to_dims(), &mut rng);
                param.data_mut().copy_from_slice(&values);
            }
        }

        let optimizer = {
            let params: Vec<_> = stages.iter().flat_map(|s| s.parameters()).collect();
            OptimizerState::new(spec.optimizer(), &params)
        };

        info!(
            "Built network with {} layers, {} parameters (seed {})",
            spec.layers().len(),
            spec.parameter_count(),
            seed
        );

        TrainedNetwork::from_parts(spec.clone(), stages, optimizer)
    }

    /// Executable layers for `spec` with zeroed parameters.
    pub(crate) fn materialize(spec: &NetworkSpec) -> Vec<Box<dyn Layer>> {
        let mut stages = Vec::with_capacity(spec.layers().len() * 2);
        let mut spatial = true;
        for desc in spec.layers() {
            let flatten_first = spatial && !desc.is_spatial();
            stages.extend(Layers::from_desc(desc, flatten_first));
            spatial = desc.is_spatial();
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::dataloader::ImageShape;
    use crate::model::layer_desc::{Activation, LayerDesc};
    use crate::model::optimizer::OptimizerConfig;
    use crate::model::weight_init::WeightInit;
    use crate::tensor::{Tensor, TensorDesc};

    fn small_spec() -> NetworkSpec {
        NetworkSpec::new(
            ImageShape::new(6, 6, 1),
            vec![
                LayerDesc::Convolution {
                    kernel: KernelConfig::new(3, 1).unwrap(),
                    in_channels: 1,
                    out_channels: 2,
                    activation: Activation::ReLU,
                },
                LayerDesc::Subsampling {
                    kernel: KernelConfig::new(2, 2).unwrap(),
                },
                LayerDesc::Output {
                    in_features: 8,
                    num_classes: 3,
                },
            ],
            OptimizerConfig::default(),
            WeightInit::Xavier,
        )
        .unwrap()
    }

    #[test]
    fn materializes_activation_and_flatten_steps() {
        let names: Vec<String> = ModelBuilder::materialize(&small_spec()).iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["Conv2D", "ReLU", "MaxPool", "Flatten", "Linear"]);
    }

    #[test]
    fn identical_seeds_give_identical_weights() {
        let a = ModelBuilder::build(&small_spec(), 666);
        let b = ModelBuilder::build(&small_spec(), 666);
        let c = ModelBuilder::build(&small_spec(), 667);
        assert_eq!(a.parameters(), b.parameters());
        assert_ne!(a.parameters(), c.parameters());
    }

    #[test]
    fn biases_start_at_zero() {
        let net = ModelBuilder::build(&small_spec(), 1);
        for param in net.parameters().iter().filter(|p| p.desc().rank() == 1) {
            assert!(param.data().iter().all(|&v| v == 0.0));
        }
        assert_eq!(net.parameter_count(), small_spec().parameter_count());
    }

    #[test]
    fn predicts_probability_rows() {
        let net = ModelBuilder::build(&small_spec(), 3);
        let input = Tensor::zeros(TensorDesc::new_tensor4d(4, 1, 6, 6));
        let probs = net.predict(&input).unwrap();
        assert_eq!(*probs.desc(), TensorDesc::new_matrix(4, 3));
        for row in probs.data().chunks(3) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }

        let wrong = Tensor::zeros(TensorDesc::new_tensor4d(4, 3, 6, 6));
        assert!(net.predict(&wrong).is_err());
    }
}
