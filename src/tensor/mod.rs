pub mod tensor;
pub mod tensor_desc;

pub use tensor::{ShapeError, Tensor};
pub use tensor_desc::TensorDesc;
