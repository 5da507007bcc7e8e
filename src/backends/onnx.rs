//! ONNX Runtime backend
//!
//! Runs both the matting model and the face restoration model. A backend owns
//! a single `Session` built from a `ModelFile`; callers that share it across
//! requests wrap it in a mutex because `Session::run` needs `&mut self`.

use crate::config::{ExecutionProvider, InferenceConfig};
use crate::error::{Result, RetouchError};
use crate::inference::{into_nchw, InferenceBackend};
use crate::models::{ModelFile, PreprocessingConfig};
use instant::{Duration, Instant};
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;

/// ONNX Runtime backend for a single model file
#[derive(Debug)]
pub struct OnnxBackend {
    model: ModelFile,
    session: Option<Session>,
}

impl OnnxBackend {
    /// List all ONNX Runtime execution providers with availability status and descriptions
    ///
    /// Returns `(name, available, description)` tuples.
    pub fn list_providers() -> Vec<(String, bool, String)> {
        log::debug!("🔍 System Hardware Analysis:");
        log::debug!("  - Platform: {os}", os = std::env::consts::OS);
        log::debug!("  - Architecture: {arch}", arch = std::env::consts::ARCH);
        log::debug!(
            "  - CPU cores: {cores}",
            cores = std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(1)
        );

        let cuda_available = cuda_available();
        let coreml_available = coreml_available();
        if !coreml_available {
            #[cfg(target_os = "macos")]
            log::warn!("❌ CoreML execution provider is not available on this macOS build");
        }

        vec![
            (
                "CPU".to_string(),
                true,
                "Always available, uses CPU for inference".to_string(),
            ),
            (
                "CUDA".to_string(),
                cuda_available,
                "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)".to_string(),
            ),
            (
                "CoreML".to_string(),
                coreml_available,
                "Apple Silicon GPU acceleration (macOS only)".to_string(),
            ),
        ]
    }

    /// Create a backend for the given model file; the session is built on `initialize`
    #[must_use]
    pub fn new(model: ModelFile) -> Self {
        Self {
            model,
            session: None,
        }
    }

    /// Pick execution providers for the requested mode, skipping unavailable ones
    fn execution_providers(provider: ExecutionProvider) -> Vec<ExecutionProviderDispatch> {
        let mut providers = Vec::new();
        let want_cuda = matches!(provider, ExecutionProvider::Auto | ExecutionProvider::Cuda);
        let want_coreml = matches!(provider, ExecutionProvider::Auto | ExecutionProvider::CoreMl);

        if want_cuda {
            if cuda_available() {
                log::info!("🚀 Using CUDA execution provider");
                providers.push(CUDAExecutionProvider::default().build());
            } else if provider == ExecutionProvider::Cuda {
                log::warn!("CUDA execution provider requested but not available, falling back to CPU");
            }
        }

        if want_coreml {
            if coreml_available() {
                log::info!("🍎 Using CoreML execution provider");
                providers.push(CoreMLExecutionProvider::default().with_subgraphs(true).build());
            } else if provider == ExecutionProvider::CoreMl {
                log::error!("🚫 CoreML execution provider requested but not available, falling back to CPU");
            }
        }

        if providers.is_empty() {
            log::info!("Using CPU execution provider");
        }
        providers
    }

    fn load_model(&mut self, config: &InferenceConfig) -> Result<Duration> {
        let model_load_start = Instant::now();
        let model_data = self.model.load_bytes()?;

        let mut session_builder = Session::builder()
            .map_err(|e| RetouchError::inference(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                RetouchError::inference(format!("Failed to set optimization level: {e}"))
            })?;

        let providers = Self::execution_providers(config.execution_provider);
        if !providers.is_empty() {
            session_builder = session_builder
                .with_execution_providers(providers)
                .map_err(|e| {
                    RetouchError::inference(format!("Failed to set execution providers: {e}"))
                })?;
        }

        let cores = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(8);
        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            cores
        };
        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (cores / 4).max(1)
        };

        let session = session_builder
            .with_intra_threads(intra_threads)
            .map_err(|e| RetouchError::inference(format!("Failed to set intra threads: {e}")))?
            .with_inter_threads(inter_threads)
            .map_err(|e| RetouchError::inference(format!("Failed to set inter threads: {e}")))?
            .commit_from_memory(&model_data)
            .map_err(|e| {
                RetouchError::model_error_with_context(
                    "load",
                    self.model.path(),
                    &e.to_string(),
                    &["verify the file is a valid ONNX export"],
                )
            })?;

        log::debug!("✅ ONNX Runtime session created for {}", self.model.path().display());
        log::debug!("  - Requested provider: {}", config.execution_provider);
        log::debug!(
            "  - Threading: {intra_threads} intra-op threads, {inter_threads} inter-op threads"
        );
        #[allow(clippy::cast_precision_loss)] // Display only
        let size_mb = model_data.len() as f64 / (1024.0 * 1024.0);
        log::debug!("  - Model size: {size_mb:.2} MB");

        self.session = Some(session);

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "📊 Model loading complete: {:.0}ms",
            model_load_time.as_secs_f64() * 1000.0
        );
        Ok(model_load_time)
    }
}

fn cuda_available() -> bool {
    OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false)
}

fn coreml_available() -> bool {
    OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default()).unwrap_or(false)
}

fn check_output_channels(model: &ModelFile, output: &Array4<f32>) -> Result<()> {
    let channels = output.dim().1;
    if channels != model.output_channels() {
        return Err(RetouchError::processing(format!(
            "Model '{}' produced {} output channels, expected {}",
            model.path().display(),
            channels,
            model.output_channels()
        )));
    }
    Ok(())
}

impl InferenceBackend for OnnxBackend {
    fn initialize(&mut self, config: &InferenceConfig) -> Result<Option<Duration>> {
        if self.session.is_some() {
            return Ok(None);
        }
        self.load_model(config).map(Some)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| RetouchError::internal("ONNX session not initialized"))?;

        let inference_start = Instant::now();
        log::debug!("🚀 Starting inference with input shape: {:?}", input.dim());

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            RetouchError::processing(format!("Failed to convert input tensor: {e}"))
        })?;

        // Positional inputs avoid depending on exported tensor names
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| RetouchError::inference(format!("ONNX inference failed: {e}")))?;

        // Matting exports carry side outputs; the first one is the prediction
        let first_key = outputs
            .keys()
            .next()
            .map(ToString::to_string)
            .ok_or_else(|| RetouchError::processing("No output tensors found"))?;
        let tensor = outputs
            .get(first_key.as_str())
            .ok_or_else(|| RetouchError::processing(format!("Output tensor '{first_key}' not found")))?
            .try_extract_array::<f32>()
            .map_err(|e| {
                RetouchError::processing(format!("Failed to extract output '{first_key}': {e}"))
            })?
            .to_owned();
        let output = into_nchw(tensor)?;
        check_output_channels(&self.model, &output)?;

        log::debug!(
            "📊 Inference complete: {:.2}ms, output shape {:?}",
            inference_start.elapsed().as_secs_f64() * 1000.0,
            output.dim()
        );
        Ok(output)
    }

    fn get_preprocessing_config(&self) -> Result<PreprocessingConfig> {
        Ok(self.model.preprocessing().clone())
    }

    fn is_initialized(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_always_listed() {
        let providers = OnnxBackend::list_providers();
        assert_eq!(providers.len(), 3);
        assert_eq!(providers[0].0, "CPU");
        assert!(providers[0].1);
    }

    #[test]
    fn test_uninitialized_backend_refuses_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isnet.onnx");
        std::fs::write(&path, b"not a model").unwrap();
        let model = ModelFile::new(&path, PreprocessingConfig::isnet(), 1).unwrap();

        let mut backend = OnnxBackend::new(model);
        assert!(!backend.is_initialized());
        assert_eq!(backend.get_preprocessing_config().unwrap().target_size, [1024, 1024]);
        let input = Array4::<f32>::zeros((1, 3, 4, 4));
        assert!(backend.infer(&input).is_err());
    }

    #[test]
    fn test_output_channels_must_match_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gfpgan.onnx");
        std::fs::write(&path, b"weights").unwrap();
        let model = ModelFile::new(&path, PreprocessingConfig::gfpgan(), 3).unwrap();

        assert!(check_output_channels(&model, &Array4::zeros((1, 3, 8, 8))).is_ok());
        let error = check_output_channels(&model, &Array4::zeros((1, 1, 8, 8))).unwrap_err();
        assert!(error.to_string().contains("1 output channels, expected 3"));
    }

    #[test]
    fn test_invalid_model_bytes_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"not a model").unwrap();
        let model = ModelFile::new(&path, PreprocessingConfig::gfpgan(), 3).unwrap();

        let mut backend = OnnxBackend::new(model);
        let err = backend.initialize(&InferenceConfig::default()).unwrap_err();
        assert!(err.to_string().contains("broken.onnx"));
    }
}
