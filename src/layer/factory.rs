use crate::config::KernelConfig;
use crate::model::layer_desc::{Activation, LayerDesc};

use super::{activations::ActivationLayer, conv2d::Conv2DLayer, layer::Layer, linear::LinearLayer, max_pool::MaxPoolLayer, reshape::FlattenLayer};

pub struct Layers;

impl Layers {
    pub fn linear(in_features: usize, out_features: usize) -> Box<dyn Layer> {
        Box::new(LinearLayer::new(in_features, out_features))
    }

    pub fn conv2d(in_channels: usize, out_channels: usize, kernel: KernelConfig) -> Box<dyn Layer> {
        Box::new(Conv2DLayer::new(in_channels, out_channels, kernel))
    }

    pub fn max_pool(kernel: KernelConfig) -> Box<dyn Layer> {
        Box::new(MaxPoolLayer::new(kernel))
    }

    pub fn flatten() -> Box<dyn Layer> {
        Box::new(FlattenLayer::new())
    }

    pub fn relu() -> Box<dyn Layer> {
        Box::new(ActivationLayer::new(Activation::ReLU))
    }

    pub fn sigmoid() -> Box<dyn Layer> {
        Box::new(ActivationLayer::new(Activation::Sigmoid))
    }

    pub fn tanh() -> Box<dyn Layer> {
        Box::new(ActivationLayer::new(Activation::Tanh))
    }

    pub fn activation(activation: Activation) -> Option<Box<dyn Layer>> {
        match activation {
            Activation::Identity => None,
            Activation::ReLU => Some(Self::relu()),
            Activation::Tanh => Some(Self::tanh()),
            Activation::Sigmoid => Some(Self::sigmoid()),
        }
    }

    /// Executable layers for one declared stage. `flatten_first` inserts a
    /// flatten step ahead of a dense stage that follows spatial activations.
    /// Output stages yield raw logits; softmax is applied by the loss.
    pub fn from_desc(desc: &LayerDesc, flatten_first: bool) -> Vec<Box<dyn Layer>> {
        let mut layers = Vec::with_capacity(3);
        if flatten_first {
            layers.push(Self::flatten());
        }
        match *desc {
            LayerDesc::Convolution {
                kernel,
                in_channels,
                out_channels,
                activation,
            } => {
                layers.push(Self::conv2d(in_channels, out_channels, kernel));
                layers.extend(Self::activation(activation));
            }
            LayerDesc::Subsampling { kernel } => layers.push(Self::max_pool(kernel)),
            LayerDesc::Dense {
                in_features,
                out_features,
                activation,
            } => {
                layers.push(Self::linear(in_features, out_features));
                layers.extend(Self::activation(activation));
            }
            LayerDesc::Output {
                in_features,
                num_classes,
            } => layers.push(Self::linear(in_features, num_classes)),
        }
        layers
    }
}
