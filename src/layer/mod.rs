pub mod activations;
pub mod conv2d;
pub mod factory;
pub mod layer;
pub mod linear;
pub mod max_pool;
pub mod reshape;

#[cfg(test)]
pub(crate) mod test_util;

pub use factory::Layers;
pub use layer::{Layer, LayerGradients};
