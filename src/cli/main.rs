//! Retouching server
//!
//! Parses flags (each with a `RETOUCH_*` environment fallback), loads both
//! models, and serves the HTTP API until Ctrl-C.

use crate::{
    backends::OnnxBackend,
    config::{ExecutionProvider, ServerConfig},
    models::{ModelFile, PreprocessingConfig},
    processor::BackgroundRemovalProcessor,
    restoration::{FaceRestorer, ModelFaceRestorer},
    server::{build_router, AppState},
    tracing_config::{spans, TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Background removal and face restoration HTTP service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-retouch")]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "RETOUCH_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "RETOUCH_PORT", default_value_t = 5001)]
    pub port: u16,

    /// ONNX matting model for /remove-background
    #[arg(long, env = "RETOUCH_MATTING_MODEL", default_value = "models/isnet-general-use.onnx")]
    pub matting_model: PathBuf,

    /// Square input size of the matting model
    #[arg(long, env = "RETOUCH_MATTING_INPUT_SIZE", default_value_t = 1024)]
    pub matting_input_size: u32,

    /// ONNX face restoration model for /restore
    #[arg(long, env = "RETOUCH_RESTORATION_MODEL", default_value = "models/GFPGANv1.4.onnx")]
    pub restoration_model: PathBuf,

    /// Directory for uploaded files
    #[arg(long, env = "RETOUCH_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Directory for restored images, served under /static/restored_images
    #[arg(long, env = "RETOUCH_RESULTS_DIR", default_value = "static/restored_images")]
    pub results_dir: PathBuf,

    /// Restoration upscale factor (1-4)
    #[arg(long, env = "RETOUCH_UPSCALE", default_value_t = 2)]
    pub upscale: u32,

    /// Execution provider (auto, cpu, cuda, coreml; an `onnx:` prefix is accepted)
    #[arg(short, long, env = "RETOUCH_EXECUTION_PROVIDER", default_value = "auto")]
    pub execution_provider: ExecutionProvider,

    /// Number of inference threads (0 = auto-detect)
    #[arg(short, long, env = "RETOUCH_THREADS", default_value_t = 0)]
    pub threads: usize,

    /// Maximum request body size in bytes
    #[arg(long, env = "RETOUCH_MAX_BODY_BYTES", default_value_t = 32 * 1024 * 1024)]
    pub max_body_bytes: usize,

    /// JPEG quality of restored images (1-100)
    #[arg(long, env = "RETOUCH_JPEG_QUALITY", default_value_t = 95)]
    pub jpeg_quality: u8,

    /// Log output format (console, compact, json with the tracing-json feature)
    #[arg(long, env = "RETOUCH_LOG_FORMAT", default_value = "console")]
    pub log_format: TracingFormat,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE); `RUST_LOG` overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show execution provider diagnostics and exit
    #[arg(long)]
    pub show_providers: bool,
}

impl Cli {
    /// Turn flags into a validated server configuration
    pub fn server_config(&self) -> Result<ServerConfig> {
        ServerConfig::builder()
            .host(self.host.clone())
            .port(self.port)
            .matting_model(&self.matting_model)
            .matting_input_size(self.matting_input_size)
            .restoration_model(&self.restoration_model)
            .upload_dir(&self.upload_dir)
            .results_dir(&self.results_dir)
            .upscale(self.upscale)
            .execution_provider(self.execution_provider)
            .num_threads(self.threads)
            .max_body_bytes(self.max_body_bytes)
            .jpeg_quality(self.jpeg_quality)
            .build()
            .context("Invalid server configuration")
    }
}

/// Main entry point for the server binary
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli).context("Failed to initialize tracing")?;

    if cli.show_providers {
        show_provider_diagnostics();
        return Ok(());
    }

    let config = cli.server_config()?;
    debug!(?config, "Configuration resolved");

    for dir in [&config.upload_dir, &config.results_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let matting = load_matting(&config)?;
    let restorer = load_restorer(&config)?;

    let state = AppState::new(&config, matting, restorer);
    let app = build_router(state, config.max_body_bytes);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Initialize tracing from the verbosity flag, or `RUST_LOG` when set
fn init_tracing(cli: &Cli) -> Result<()> {
    let mut tracing = TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        tracing = tracing.with_env_filter(filter);
    }
    tracing
        .init()
        .context("Failed to initialize tracing subscriber")
}

/// Describe a model file, or fail startup if the weights are missing
fn model_file(path: &Path, preprocessing: PreprocessingConfig, channels: usize) -> Result<ModelFile> {
    ModelFile::new(path, preprocessing, channels)
        .with_context(|| format!("Model weights unavailable at {}", path.display()))
}

fn load_matting(config: &ServerConfig) -> Result<Option<BackgroundRemovalProcessor>> {
    let model = model_file(&config.matting_model, config.matting_preprocessing.clone(), 1)?;
    let provider = config.inference.execution_provider.to_string();
    let _span = spans::model_loading("matting", model.path(), &provider).entered();

    match BackgroundRemovalProcessor::new(Box::new(OnnxBackend::new(model)), &config.inference) {
        Ok(processor) => Ok(Some(processor)),
        Err(e) => {
            error!(error = %e, "Background removal model failed to load; /remove-background will return 500");
            Ok(None)
        },
    }
}

fn load_restorer(config: &ServerConfig) -> Result<Option<Box<dyn FaceRestorer>>> {
    let model = model_file(
        &config.restoration_model,
        config.restoration_preprocessing.clone(),
        3,
    )?;
    let provider = config.inference.execution_provider.to_string();
    let _span = spans::model_loading("restoration", model.path(), &provider).entered();

    match ModelFaceRestorer::new(Box::new(OnnxBackend::new(model)), &config.inference) {
        Ok(restorer) => Ok(Some(Box::new(restorer))),
        Err(e) => {
            error!(error = %e, "Face restoration model failed to load; /restore will return 500");
            Ok(None)
        },
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Display execution provider diagnostics
fn show_provider_diagnostics() {
    println!("🔍 Execution Provider Diagnostics");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cpu_count = std::thread::available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1);
    println!("💻 System: {cpu_count} CPU cores detected");

    println!("\n🚀 Execution Providers:");
    for (name, available, description) in OnnxBackend::list_providers() {
        let status = if available {
            "✅ Available"
        } else {
            "❌ Not Available"
        };
        println!("  • {name}: {status} - {description}");
    }

    println!("\n💡 Usage Examples:");
    println!("  --execution-provider auto    # Auto-select best provider (default)");
    println!("  --execution-provider cuda    # Use NVIDIA CUDA");
    println!("  --execution-provider coreml  # Use Apple CoreML (macOS)");
    println!("  --execution-provider cpu     # Force CPU execution");
}
