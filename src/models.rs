//! Model files and their metadata

use crate::error::{Result, RetouchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tensor preprocessing parameters for a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Square input size (height, width)
    pub target_size: [u32; 2],
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl PreprocessingConfig {
    /// ISNet general-use matting model
    #[must_use]
    pub fn isnet() -> Self {
        Self {
            target_size: [1024, 1024],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }

    /// GFPGAN face restoration model (inputs and outputs in [-1, 1])
    #[must_use]
    pub fn gfpgan() -> Self {
        Self {
            target_size: [512, 512],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [0.5, 0.5, 0.5],
        }
    }

    /// Validate that the parameters can produce a usable tensor
    pub fn validate(&self) -> Result<()> {
        let [h, w] = self.target_size;
        if h == 0 || w == 0 || h != w {
            return Err(RetouchError::invalid_config(format!(
                "Model input size must be square and non-zero, got {}x{}",
                w, h
            )));
        }
        if self.normalization_std.iter().any(|s| *s <= 0.0) {
            return Err(RetouchError::invalid_config(
                "Normalization std values must be positive",
            ));
        }
        Ok(())
    }
}

/// A model weights file on disk plus how to feed it
#[derive(Debug, Clone)]
pub struct ModelFile {
    path: PathBuf,
    preprocessing: PreprocessingConfig,
    output_channels: usize,
}

impl ModelFile {
    /// Describe a model file; fails if the weights are absent
    pub fn new<P: Into<PathBuf>>(
        path: P,
        preprocessing: PreprocessingConfig,
        output_channels: usize,
    ) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(RetouchError::model_error_with_context(
                "locate",
                &path,
                "weights file not found",
                &["download the ONNX export of the model", "check the model path flag"],
            ));
        }
        preprocessing.validate()?;
        Ok(Self {
            path,
            preprocessing,
            output_channels,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn preprocessing(&self) -> &PreprocessingConfig {
        &self.preprocessing
    }

    /// Read the raw model bytes
    pub fn load_bytes(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path)
            .map_err(|e| RetouchError::file_io_error("read model file", &self.path, &e))
    }

    /// Channel count of the model's first output (1 for a mask, 3 for RGB)
    #[must_use]
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_weights_rejected() {
        let err = ModelFile::new(
            "/definitely/not/here.onnx",
            PreprocessingConfig::isnet(),
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("weights file not found"));
    }

    #[test]
    fn test_existing_file_is_described() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GFPGANv1.4.onnx");
        std::fs::write(&path, [0u8; 64]).unwrap();

        let model = ModelFile::new(&path, PreprocessingConfig::gfpgan(), 3).unwrap();
        assert_eq!(model.path(), path.as_path());
        assert_eq!(model.preprocessing().target_size, [512, 512]);
        assert_eq!(model.output_channels(), 3);
        assert_eq!(model.load_bytes().unwrap().len(), 64);
    }

    #[test]
    fn test_preprocessing_validation() {
        assert!(PreprocessingConfig::isnet().validate().is_ok());

        let mut config = PreprocessingConfig::gfpgan();
        config.target_size = [512, 256];
        assert!(config.validate().is_err());

        let mut config = PreprocessingConfig::gfpgan();
        config.normalization_std = [0.5, 0.0, 0.5];
        assert!(config.validate().is_err());
    }
}
