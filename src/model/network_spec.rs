use serde::{Deserialize, Serialize};

use crate::config::ConvolutionConfig;
use crate::dataloader::ImageShape;
use crate::tensor::TensorDesc;

use super::error::ArchitectureError;
use super::layer_desc::{Activation, LayerDesc};
use super::layer_shape::LayerShape;
use super::optimizer::OptimizerConfig;
use super::weight_init::WeightInit;

pub type InputShape = ImageShape;

/// Widths and activations of the fixed conv-pool-conv-pool-dense family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchitectureConfig {
    pub first_conv_channels: usize,
    pub second_conv_channels: usize,
    pub conv_activation: Activation,
    pub first_dense_features: usize,
    pub second_dense_features: Option<usize>,
    pub dense_activation: Activation,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        Self {
            first_conv_channels: 64,
            second_conv_channels: 128,
            conv_activation: Activation::Identity,
            first_dense_features: 4800,
            second_dense_features: Some(1200),
            dense_activation: Activation::ReLU,
        }
    }
}

/// A validated declarative network: every layer's declared sizes agree with
/// the shape flowing into it, and the stack ends in a single output layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    input: InputShape,
    layers: Vec<LayerDesc>,
    optimizer: OptimizerConfig,
    weight_init: WeightInit,
}

impl NetworkSpec {
    pub fn new(
        input: InputShape,
        layers: Vec<LayerDesc>,
        optimizer: OptimizerConfig,
        weight_init: WeightInit,
    ) -> Result<Self, ArchitectureError> {
        let spec = Self {
            input,
            layers,
            optimizer,
            weight_init,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// `Conv → Pool → Conv → Pool → Dense → [Dense] → Output`, with every
    /// in-size derived from the input geometry and the kernels.
    pub fn convolutional(
        input: InputShape,
        kernels: &ConvolutionConfig,
        architecture: &ArchitectureConfig,
        num_classes: usize,
        optimizer: OptimizerConfig,
        weight_init: WeightInit,
    ) -> Result<Self, ArchitectureError> {
        let conv = kernels.convolution();
        let pool = kernels.subsampling();

        let mut layers = Vec::with_capacity(7);
        let mut shape = LayerShape::from_image(input);

        push_checked(
            &mut layers,
            &mut shape,
            LayerDesc::Convolution {
                kernel: conv,
                in_channels: input.channels,
                out_channels: architecture.first_conv_channels,
                activation: architecture.conv_activation,
            },
        )?;
        push_checked(&mut layers, &mut shape, LayerDesc::Subsampling { kernel: pool })?;
        push_checked(
            &mut layers,
            &mut shape,
            LayerDesc::Convolution {
                kernel: conv,
                in_channels: architecture.first_conv_channels,
                out_channels: architecture.second_conv_channels,
                activation: architecture.conv_activation,
            },
        )?;
        push_checked(&mut layers, &mut shape, LayerDesc::Subsampling { kernel: pool })?;

        let dense_widths = std::iter::once(architecture.first_dense_features).chain(architecture.second_dense_features);
        for width in dense_widths {
            let desc = LayerDesc::Dense {
                in_features: shape.features(),
                out_features: width,
                activation: architecture.dense_activation,
            };
            push_checked(&mut layers, &mut shape, desc)?;
        }

        let desc = LayerDesc::Output {
            in_features: shape.features(),
            num_classes,
        };
        push_checked(&mut layers, &mut shape, desc)?;

        Self::new(input, layers, optimizer, weight_init)
    }

    fn validate(&self) -> Result<(), ArchitectureError> {
        if self.layers.is_empty() {
            return Err(ArchitectureError::EmptyNetwork);
        }
        if self.input.height == 0 || self.input.width == 0 || self.input.channels == 0 {
            return Err(ArchitectureError::ZeroSized { layer: 0 });
        }

        let last = self.layers.len() - 1;
        if let Some(index) = self
            .layers
            .iter()
            .position(|l| matches!(l, LayerDesc::Output { .. }))
            .filter(|&index| index != last)
        {
            return Err(ArchitectureError::OutputNotLast { layer: index });
        }
        if !matches!(self.layers[last], LayerDesc::Output { .. }) {
            return Err(ArchitectureError::MissingOutput);
        }

        self.optimizer.validate()?;
        self.layer_shapes().map(|_| ())
    }

    /// Per-sample activation shape after each layer.
    pub fn layer_shapes(&self) -> Result<Vec<LayerShape>, ArchitectureError> {
        let mut shape = LayerShape::from_image(self.input);
        self.layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                shape = shape.next(index, layer)?;
                Ok(shape)
            })
            .collect()
    }

    pub fn input(&self) -> InputShape {
        self.input
    }

    pub fn layers(&self) -> &[LayerDesc] {
        &self.layers
    }

    pub fn optimizer(&self) -> &OptimizerConfig {
        &self.optimizer
    }

    pub fn weight_init(&self) -> WeightInit {
        self.weight_init
    }

    pub fn num_classes(&self) -> usize {
        match self.layers.last() {
            Some(LayerDesc::Output { num_classes, .. }) => *num_classes,
            _ => 0,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(LayerDesc::parameter_count).sum()
    }

    /// Every parameter tensor shape in network order. Computed from the
    /// declarations alone, nothing is allocated.
    pub fn parameter_descs(&self) -> Vec<TensorDesc> {
        self.layers.iter().flat_map(LayerDesc::parameter_descs).collect()
    }

    /// Re-checks a spec obtained from outside a constructor, e.g. deserialized.
    pub(crate) fn revalidate(&self) -> Result<(), ArchitectureError> {
        self.validate()
    }
}

fn push_checked(layers: &mut Vec<LayerDesc>, shape: &mut LayerShape, desc: LayerDesc) -> Result<(), ArchitectureError> {
    *shape = shape.next(layers.len(), &desc)?;
    layers.push(desc);
    Ok(())
}
