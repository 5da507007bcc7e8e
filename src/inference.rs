//! Inference backend abstraction

use crate::{
    config::InferenceConfig,
    error::{Result, RetouchError},
    models::PreprocessingConfig,
};
use ndarray::{Array4, ArrayD, Ix4};

use instant::Duration;

/// Trait for inference backends
pub trait InferenceBackend: Send {
    /// Initialize the backend with the given session options
    ///
    /// # Errors
    /// - Backend initialization failures
    /// - Model loading or validation errors
    fn initialize(&mut self, config: &InferenceConfig) -> Result<Option<Duration>>;

    /// Run inference and return the first output as an NCHW tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - The model produced no outputs or the first one is not 4D
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Get preprocessing configuration for this backend
    ///
    /// # Errors
    /// - Model metadata unavailable
    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}

/// Reinterpret a dynamic tensor as NCHW
pub fn into_nchw(tensor: ArrayD<f32>) -> Result<Array4<f32>> {
    let ndim = tensor.ndim();
    tensor.into_dimensionality::<Ix4>().map_err(|_| {
        RetouchError::processing(format!("Expected 4D output tensor, got {}D", ndim))
    })
}
