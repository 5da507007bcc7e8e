//! Mock backend implementation for testing and development

use crate::config::InferenceConfig;
use crate::error::{Result, RetouchError};
use crate::inference::InferenceBackend;
use crate::models::PreprocessingConfig;
use instant::Duration;
use ndarray::Array4;

/// What the mock produces
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockOutput {
    /// Single-channel map filled with a constant (matting style)
    Constant(f32),
    /// Echo the input tensor (restoration style)
    Identity,
}

/// Mock backend for testing purposes
///
/// Produces deterministic tensors without requiring model files.
#[derive(Debug)]
pub struct MockBackend {
    preprocessing: PreprocessingConfig,
    output: MockOutput,
    initialized: bool,
}

impl MockBackend {
    /// Matting mock that predicts `alpha` for every pixel
    #[must_use]
    pub fn matting(input_size: u32, alpha: f32) -> Self {
        let mut preprocessing = PreprocessingConfig::isnet();
        preprocessing.target_size = [input_size, input_size];
        Self {
            preprocessing,
            output: MockOutput::Constant(alpha),
            initialized: false,
        }
    }

    /// Restoration mock that returns its input unchanged
    #[must_use]
    pub fn restoration(input_size: u32) -> Self {
        let mut preprocessing = PreprocessingConfig::gfpgan();
        preprocessing.target_size = [input_size, input_size];
        Self {
            preprocessing,
            output: MockOutput::Identity,
            initialized: false,
        }
    }

    fn size(&self) -> usize {
        self.preprocessing.target_size[0] as usize
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, _config: &InferenceConfig) -> Result<Option<Duration>> {
        self.initialized = true;
        Ok(None)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = input.dim();
        if c != 3 || h != self.size() || w != self.size() {
            return Err(RetouchError::inference(format!(
                "Mock expects (N, 3, {size}, {size}) input, got {:?}",
                input.dim(),
                size = self.size()
            )));
        }

        Ok(match self.output {
            MockOutput::Constant(value) => Array4::<f32>::from_elem((n, 1, h, w), value),
            MockOutput::Identity => input.clone(),
        })
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.preprocessing.clone())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}
