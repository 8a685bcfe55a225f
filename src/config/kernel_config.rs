use serde::{Deserialize, Serialize};

use super::error::ConfigLoadError;

/// Square kernel used by convolution and subsampling layers.
///
/// Fields are private; the only ways in are [`KernelConfig::new`] and
/// deserialization, both of which reject zero sizes and strides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKernelConfig")]
pub struct KernelConfig {
    size: usize,
    stride: usize,
}

#[derive(Deserialize)]
struct RawKernelConfig {
    size: usize,
    stride: usize,
}

impl TryFrom<RawKernelConfig> for KernelConfig {
    type Error = ConfigLoadError;

    fn try_from(raw: RawKernelConfig) -> Result<Self, Self::Error> {
        KernelConfig::new(raw.size, raw.stride)
    }
}

impl KernelConfig {
    pub fn new(size: usize, stride: usize) -> Result<Self, ConfigLoadError> {
        if size == 0 || stride == 0 {
            return Err(ConfigLoadError::InvalidKernel { size, stride });
        }
        Ok(Self { size, stride })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Spatial extent after sliding this kernel over `input` without padding.
    /// `None` when the kernel does not fit.
    pub fn output_extent(&self, input: usize) -> Option<usize> {
        if input < self.size {
            return None;
        }
        Some((input - self.size) / self.stride + 1)
    }
}

impl std::fmt::Display for KernelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}/{}", self.size, self.size, self.stride)
    }
}

/// Kernel shapes shared by every convolution and subsampling stage of the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvolutionConfig {
    convolution_layer_kernel_config: KernelConfig,
    subsampling_layer_kernel_config: KernelConfig,
}

impl ConvolutionConfig {
    pub fn new(convolution: KernelConfig, subsampling: KernelConfig) -> Self {
        Self {
            convolution_layer_kernel_config: convolution,
            subsampling_layer_kernel_config: subsampling,
        }
    }

    pub fn from_sizes(
        convolution_size: usize,
        convolution_stride: usize,
        subsampling_size: usize,
        subsampling_stride: usize,
    ) -> Result<Self, ConfigLoadError> {
        Ok(Self::new(
            KernelConfig::new(convolution_size, convolution_stride)?,
            KernelConfig::new(subsampling_size, subsampling_stride)?,
        ))
    }

    pub fn convolution(&self) -> KernelConfig {
        self.convolution_layer_kernel_config
    }

    pub fn subsampling(&self) -> KernelConfig {
        self.subsampling_layer_kernel_config
    }
}

impl Default for ConvolutionConfig {
    // 3×3/1 convolution, 2×2/2 max pooling
    fn default() -> Self {
        Self::new(
            KernelConfig { size: 3, stride: 1 },
            KernelConfig { size: 2, stride: 2 },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_or_stride_is_rejected() {
        assert!(KernelConfig::new(0, 1).is_err());
        assert!(KernelConfig::new(3, 0).is_err());
        assert!(KernelConfig::new(3, 1).is_ok());
    }

    #[test]
    fn output_extent_floors() {
        let k = KernelConfig::new(3, 2).unwrap();
        assert_eq!(k.output_extent(32), Some(15));
        assert_eq!(k.output_extent(3), Some(1));
        assert_eq!(k.output_extent(2), None);
    }

    #[test]
    fn deserialize_validates_kernel() {
        let bad = r#"{"size": 0, "stride": 1}"#;
        assert!(serde_json::from_str::<KernelConfig>(bad).is_err());
    }

    #[test]
    fn convolution_config_uses_camel_case_fields() {
        let json = serde_json::to_value(ConvolutionConfig::default()).unwrap();
        assert_eq!(json["convolutionLayerKernelConfig"]["size"], 3);
        assert_eq!(json["subsamplingLayerKernelConfig"]["stride"], 2);
    }
}
