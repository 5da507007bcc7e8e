//! Configuration types for the retouching service

use crate::error::{Result, RetouchError};
use crate::models::PreprocessingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl std::str::FromStr for ExecutionProvider {
    type Err = RetouchError;

    fn from_str(s: &str) -> Result<Self> {
        // Accept the "onnx:<provider>" form as well as the bare provider name
        let provider = s.strip_prefix("onnx:").unwrap_or(s);
        match provider.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(RetouchError::invalid_config(format!(
                "Unknown ONNX provider: {}. Supported: auto, cpu, cuda, coreml",
                other
            ))),
        }
    }
}

/// Encodings produced by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossless RGBA, used for background removal results
    Png,
    /// Lossy RGB, used for restored images
    Jpeg,
}

/// Session options shared by every inference backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub execution_provider: ExecutionProvider,
    /// Number of intra-op threads (0 = auto)
    pub intra_threads: usize,
    /// Number of inter-op threads (0 = auto)
    pub inter_threads: usize,
}

/// Fixed parameters passed to the face restoration model on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceParams {
    /// Output resolution multiplier
    pub upscale: u32,
    /// Input faces are already cropped and aligned
    pub has_aligned: bool,
    /// Restore only the central face region
    pub only_center_face: bool,
    /// Composite the restored region back onto the upscaled image
    pub paste_back: bool,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            upscale: 2,
            has_aligned: false,
            only_center_face: false,
            paste_back: true,
        }
    }
}

/// Complete configuration of the HTTP service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// ONNX matting model used by `/remove-background`
    pub matting_model: PathBuf,
    /// ONNX face restoration model used by `/restore`
    pub restoration_model: PathBuf,
    pub matting_preprocessing: PreprocessingConfig,
    pub restoration_preprocessing: PreprocessingConfig,
    /// Where uploaded files are persisted before restoration
    pub upload_dir: PathBuf,
    /// Where restored files are written and served from
    pub results_dir: PathBuf,
    pub enhance: EnhanceParams,
    pub inference: InferenceConfig,
    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,
    /// JPEG quality of restored images (1-100)
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            matting_model: PathBuf::from("models/isnet-general-use.onnx"),
            restoration_model: PathBuf::from("models/GFPGANv1.4.onnx"),
            matting_preprocessing: PreprocessingConfig::isnet(),
            restoration_preprocessing: PreprocessingConfig::gfpgan(),
            upload_dir: PathBuf::from("uploads"),
            results_dir: PathBuf::from("static/restored_images"),
            enhance: EnhanceParams::default(),
            inference: InferenceConfig::default(),
            max_body_bytes: 32 * 1024 * 1024,
            jpeg_quality: 95,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Listen address in `host:port` form
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Upscale factor outside 1-4
    /// - JPEG quality outside 1-100
    /// - Zero body limit
    /// - Invalid model preprocessing parameters
    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.enhance.upscale) {
            return Err(RetouchError::config_value_error(
                "upscale factor",
                self.enhance.upscale,
                "1-4",
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RetouchError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "1-100",
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(RetouchError::invalid_config(
                "Maximum body size must be greater than zero",
            ));
        }
        if self.upload_dir == self.results_dir {
            return Err(RetouchError::invalid_config(
                "Upload and results directories must differ",
            ));
        }
        self.matting_preprocessing.validate()?;
        self.restoration_preprocessing.validate()?;
        Ok(())
    }
}

/// Builder for `ServerConfig`
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn matting_model<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.matting_model = path.into();
        self
    }

    #[must_use]
    pub fn restoration_model<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.restoration_model = path.into();
        self
    }

    /// Override the matting model input size
    #[must_use]
    pub fn matting_input_size(mut self, size: u32) -> Self {
        self.config.matting_preprocessing.target_size = [size, size];
        self
    }

    #[must_use]
    pub fn upload_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    #[must_use]
    pub fn results_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.results_dir = dir.into();
        self
    }

    #[must_use]
    pub fn upscale(mut self, factor: u32) -> Self {
        self.config.enhance.upscale = factor;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.inference.execution_provider = provider;
        self
    }

    /// Set both intra and inter threads (0 = auto-detect)
    #[must_use]
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.inference.intra_threads = threads;
        self.config.inference.inter_threads = if threads > 0 { (threads / 2).max(1) } else { 0 };
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// Returns `RetouchError::InvalidConfig` when validation fails
    pub fn build(self) -> Result<ServerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
