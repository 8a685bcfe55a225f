pub mod classifier_config;
pub mod error;
pub mod kernel_config;
pub mod loader;

pub use classifier_config::ClassifierConfig;
pub use error::ConfigLoadError;
pub use kernel_config::{ConvolutionConfig, KernelConfig};
pub use loader::{parse_json, ConfigLoader, JsonConfigLoader};
