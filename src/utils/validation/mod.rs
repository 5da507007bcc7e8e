//! Validation helpers shared by the processing pipelines

pub mod tensor;

pub use tensor::TensorValidator;
