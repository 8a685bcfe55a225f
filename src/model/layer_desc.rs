use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;
use crate::tensor::TensorDesc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Activation {
    #[default]
    Identity,
    ReLU,
    Tanh,
    Sigmoid,
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Activation::Identity => "Identity",
            Activation::ReLU => "ReLU",
            Activation::Tanh => "Tanh",
            Activation::Sigmoid => "Sigmoid",
        };
        f.write_str(name)
    }
}

/// One declared stage of a network, before any weights exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerDesc {
    Convolution {
        kernel: KernelConfig,
        in_channels: usize,
        out_channels: usize,
        activation: Activation,
    },
    /// Max pooling.
    Subsampling { kernel: KernelConfig },
    Dense {
        in_features: usize,
        out_features: usize,
        activation: Activation,
    },
    /// Softmax over `num_classes` logits trained with negative log-likelihood.
    Output { in_features: usize, num_classes: usize },
}

impl LayerDesc {
    pub fn name(&self) -> &'static str {
        match self {
            LayerDesc::Convolution { .. } => "Convolution",
            LayerDesc::Subsampling { .. } => "Subsampling",
            LayerDesc::Dense { .. } => "Dense",
            LayerDesc::Output { .. } => "Output",
        }
    }

    pub fn is_spatial(&self) -> bool {
        matches!(self, LayerDesc::Convolution { .. } | LayerDesc::Subsampling { .. })
    }

    /// Shapes of the weight and bias tensors this stage owns, in the order
    /// the layer exposes them.
    pub fn parameter_descs(&self) -> Vec<TensorDesc> {
        match *self {
            LayerDesc::Convolution {
                kernel,
                in_channels,
                out_channels,
                ..
            } => vec![
                TensorDesc::new_tensor4d(out_channels, in_channels, kernel.size(), kernel.size()),
                TensorDesc::new_vector(out_channels),
            ],
            LayerDesc::Subsampling { .. } => Vec::new(),
            LayerDesc::Dense {
                in_features,
                out_features: out,
                ..
            }
            | LayerDesc::Output {
                in_features,
                num_classes: out,
            } => vec![TensorDesc::new_matrix(out, in_features), TensorDesc::new_vector(out)],
        }
    }

    pub fn parameter_count(&self) -> usize {
        match *self {
            LayerDesc::Convolution {
                kernel,
                in_channels,
                out_channels,
                ..
            } => out_channels * in_channels * kernel.size() * kernel.size() + out_channels,
            LayerDesc::Subsampling { .. } => 0,
            LayerDesc::Dense {
                in_features,
                out_features,
                ..
            } => out_features * in_features + out_features,
            LayerDesc::Output {
                in_features,
                num_classes,
            } => num_classes * in_features + num_classes,
        }
    }
}

impl std::fmt::Display for LayerDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerDesc::Convolution {
                kernel,
                in_channels,
                out_channels,
                activation,
            } => write!(f, "Convolution({in_channels}→{out_channels}, kernel={kernel}, {activation})"),
            LayerDesc::Subsampling { kernel } => write!(f, "Subsampling(max, kernel={kernel})"),
            LayerDesc::Dense {
                in_features,
                out_features,
                activation,
            } => write!(f, "Dense({in_features}→{out_features}, {activation})"),
            LayerDesc::Output {
                in_features,
                num_classes,
            } => write!(f, "Output({in_features}→{num_classes}, Softmax/NLL)"),
        }
    }
}
