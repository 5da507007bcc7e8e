//! Shared utilities for preprocessing and validation

pub mod preprocessing;
pub mod validation;

pub use preprocessing::{ImagePreprocessor, Letterbox, PreprocessedImage, PreprocessingOptions};
pub use validation::TensorValidator;
