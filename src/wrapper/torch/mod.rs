//! torch 包装

pub mod tensor;
pub use tensor::TensorWrapper;
