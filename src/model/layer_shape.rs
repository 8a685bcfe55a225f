use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;
use crate::dataloader::ImageShape;
use crate::tensor::TensorDesc;

use super::error::ArchitectureError;
use super::layer_desc::LayerDesc;

/// Per-sample activation shape flowing between layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerShape {
    Spatial {
        channels: usize,
        height: usize,
        width: usize,
    },
    Flat { features: usize },
}

impl LayerShape {
    pub fn from_image(shape: ImageShape) -> Self {
        LayerShape::Spatial {
            channels: shape.channels,
            height: shape.height,
            width: shape.width,
        }
    }

    /// Element count of one sample, i.e. the width of its flattened form.
    pub fn features(&self) -> usize {
        match *self {
            LayerShape::Spatial {
                channels,
                height,
                width,
            } => channels.saturating_mul(height).saturating_mul(width),
            LayerShape::Flat { features } => features,
        }
    }

    pub fn to_desc(&self, batch: usize) -> TensorDesc {
        match *self {
            LayerShape::Spatial {
                channels,
                height,
                width,
            } => TensorDesc::new_tensor4d(batch, channels, height, width),
            LayerShape::Flat { features } => TensorDesc::new_matrix(batch, features),
        }
    }

    /// Shape after `layer`, which sits at position `index` of the stack.
    pub fn next(&self, index: usize, layer: &LayerDesc) -> Result<LayerShape, ArchitectureError> {
        match *layer {
            LayerDesc::Convolution {
                kernel,
                in_channels,
                out_channels,
                ..
            } => {
                let (channels, height, width) = self.spatial(index)?;
                if in_channels != channels {
                    return Err(ArchitectureError::ChannelMismatch {
                        layer: index,
                        expected: in_channels,
                        actual: channels,
                    });
                }
                if out_channels == 0 {
                    return Err(ArchitectureError::ZeroSized { layer: index });
                }
                let (height, width) = slide(index, kernel, height, width)?;
                Ok(LayerShape::Spatial {
                    channels: out_channels,
                    height,
                    width,
                })
            }
            LayerDesc::Subsampling { kernel } => {
                let (channels, height, width) = self.spatial(index)?;
                let (height, width) = slide(index, kernel, height, width)?;
                Ok(LayerShape::Spatial {
                    channels,
                    height,
                    width,
                })
            }
            LayerDesc::Dense {
                in_features,
                out_features,
                ..
            } => self.flat_into(index, in_features, out_features),
            LayerDesc::Output {
                in_features,
                num_classes,
            } => self.flat_into(index, in_features, num_classes),
        }
    }

    fn spatial(&self, index: usize) -> Result<(usize, usize, usize), ArchitectureError> {
        match *self {
            LayerShape::Spatial {
                channels,
                height,
                width,
            } => Ok((channels, height, width)),
            LayerShape::Flat { .. } => Err(ArchitectureError::SpatialInputRequired { layer: index }),
        }
    }

    fn flat_into(&self, index: usize, in_features: usize, out_features: usize) -> Result<LayerShape, ArchitectureError> {
        if in_features != self.features() {
            return Err(ArchitectureError::FeatureMismatch {
                layer: index,
                expected: in_features,
                actual: self.features(),
            });
        }
        if out_features == 0 {
            return Err(ArchitectureError::ZeroSized { layer: index });
        }
        Ok(LayerShape::Flat {
            features: out_features,
        })
    }
}

fn slide(index: usize, kernel: KernelConfig, height: usize, width: usize) -> Result<(usize, usize), ArchitectureError> {
    match (kernel.output_extent(height), kernel.output_extent(width)) {
        (Some(h), Some(w)) => Ok((h, w)),
        _ => Err(ArchitectureError::KernelTooLarge {
            layer: index,
            kernel: kernel.size(),
            height,
            width,
        }),
    }
}

impl std::fmt::Display for LayerShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerShape::Spatial {
                channels,
                height,
                width,
            } => write!(f, "{channels}×{height}×{width}"),
            LayerShape::Flat { features } => write!(f, "{features}"),
        }
    }
}
