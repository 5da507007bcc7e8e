use crate::{
    config::{EnhanceParams, ServerConfig},
    processor::BackgroundRemovalProcessor,
    restoration::FaceRestorer,
};
use chrono::{DateTime, Utc};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Shared model handle; `None` when the model failed to load at startup
pub type ModelHandle<T> = Option<Arc<Mutex<T>>>;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub matting: ModelHandle<BackgroundRemovalProcessor>,
    pub restorer: ModelHandle<Box<dyn FaceRestorer>>,
    pub upload_dir: Arc<PathBuf>,
    pub results_dir: Arc<PathBuf>,
    pub enhance: EnhanceParams,
    pub jpeg_quality: u8,
    pub started_at: DateTime<Utc>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("matting_loaded", &self.matting.is_some())
            .field("restorer_loaded", &self.restorer.is_some())
            .field("upload_dir", &self.upload_dir)
            .field("results_dir", &self.results_dir)
            .field("enhance", &self.enhance)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl AppState {
    /// Assemble state from the configuration and whichever models loaded
    pub fn new(
        config: &ServerConfig,
        matting: Option<BackgroundRemovalProcessor>,
        restorer: Option<Box<dyn FaceRestorer>>,
    ) -> Self {
        Self {
            matting: matting.map(|p| Arc::new(Mutex::new(p))),
            restorer: restorer.map(|r| Arc::new(Mutex::new(r))),
            upload_dir: Arc::new(config.upload_dir.clone()),
            results_dir: Arc::new(config.results_dir.clone()),
            enhance: config.enhance,
            jpeg_quality: config.jpeg_quality,
            started_at: Utc::now(),
        }
    }
}

/// Lock a model handle, recovering from a panic in a previous request
pub(crate) fn lock_model<T: ?Sized>(handle: &Mutex<T>) -> MutexGuard<'_, T> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
