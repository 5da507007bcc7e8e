#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # IMG.LY Retouch
//!
//! Background removal and face restoration behind a small HTTP API.
//!
//! ## Features
//!
//! - **Model matting**: an `ISNet`-style ONNX model predicts a foreground
//!   alpha mask; the cutout is returned as a base64 PNG
//! - **Threshold removal**: near-white pixels (BT.601 luma above 240) become
//!   transparent, no model required
//! - **Face restoration**: a `GFPGAN`-style ONNX model restores an uploaded
//!   photo; the result is written as JPEG and served from the results directory
//! - **Hardware Acceleration**: CUDA, `CoreML`, and CPU execution providers
//! - **Server Binary**: enable the `cli` feature for `imgly-retouch`
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use imgly_retouch::{
//!     backends::OnnxBackend, build_router, AppState, BackgroundRemovalProcessor,
//!     ModelFile, PreprocessingConfig, ServerConfig,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::default();
//! let model = ModelFile::new(&config.matting_model, PreprocessingConfig::isnet(), 1)?;
//! let matting = BackgroundRemovalProcessor::new(
//!     Box::new(OnnxBackend::new(model)),
//!     &config.inference,
//! )?;
//!
//! let state = AppState::new(&config, Some(matting), None);
//! let app = build_router(state, config.max_body_bytes);
//! let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime backend with GPU acceleration support
//! - `cli` (default): server binary with argument parsing and log setup
//! - `tracing-json`: JSON log output

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod processor;
pub mod restoration;
pub mod server;
pub mod services;
pub mod threshold;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use config::{EnhanceParams, ExecutionProvider, InferenceConfig, OutputFormat, ServerConfig};
pub use error::{ErrorKind, Result, RetouchError};
pub use inference::InferenceBackend;
pub use models::{ModelFile, PreprocessingConfig};
pub use processor::{BackgroundRemovalProcessor, RemovalResult};
pub use restoration::{EnhanceOutput, FaceRestorer, ModelFaceRestorer};
pub use server::{build_router, ApiError, AppState};
pub use services::{ImageIOService, OutputFormatHandler, UploadNames};
pub use tracing_config::{spans, TracingConfig, TracingFormat};
pub use types::{ProcessingTimings, SegmentationMask};
pub use utils::{ImagePreprocessor, Letterbox, PreprocessingOptions, TensorValidator};
