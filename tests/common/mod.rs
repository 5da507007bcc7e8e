//! Shared helpers for the HTTP integration tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imgly_retouch::{
    backends::MockBackend,
    build_router,
    config::{EnhanceParams, InferenceConfig, ServerConfig},
    error::Result,
    processor::BackgroundRemovalProcessor,
    restoration::{EnhanceOutput, FaceRestorer, ModelFaceRestorer},
    AppState,
};
use std::{
    io::Cursor,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "retouch-test-boundary";

/// A router plus the temporary directories it writes into
pub struct TestApp {
    pub router: Router,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    _root: TempDir,
}

impl TestApp {
    /// Build an app around whichever models the test supplies
    pub fn new(
        matting: Option<BackgroundRemovalProcessor>,
        restorer: Option<Box<dyn FaceRestorer>>,
    ) -> Self {
        Self::with_body_limit(matting, restorer, 32 * 1024 * 1024)
    }

    pub fn with_body_limit(
        matting: Option<BackgroundRemovalProcessor>,
        restorer: Option<Box<dyn FaceRestorer>>,
        max_body_bytes: usize,
    ) -> Self {
        let root = TempDir::new().unwrap();
        let upload_dir = root.path().join("uploads");
        let results_dir = root.path().join("static").join("restored_images");
        std::fs::create_dir_all(&upload_dir).unwrap();
        std::fs::create_dir_all(&results_dir).unwrap();

        let config = ServerConfig::builder()
            .upload_dir(&upload_dir)
            .results_dir(&results_dir)
            .max_body_bytes(max_body_bytes)
            .build()
            .unwrap();
        let state = AppState::new(&config, matting, restorer);

        Self {
            router: build_router(state, max_body_bytes),
            upload_dir,
            results_dir,
            _root: root,
        }
    }

    /// Both models backed by mocks
    pub fn mocked() -> Self {
        Self::new(Some(mock_matting(1.0)), Some(mock_restorer()))
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn post_restore(&self, field: &str, file_name: &str, data: &[u8]) -> (StatusCode, Vec<u8>) {
        let request = Request::post("/restore")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, file_name, data)))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub fn files_in(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn mock_matting(alpha: f32) -> BackgroundRemovalProcessor {
    BackgroundRemovalProcessor::new(
        Box::new(MockBackend::matting(32, alpha)),
        &InferenceConfig::default(),
    )
    .unwrap()
}

pub fn mock_restorer() -> Box<dyn FaceRestorer> {
    Box::new(
        ModelFaceRestorer::new(
            Box::new(MockBackend::restoration(32)),
            &InferenceConfig::default(),
        )
        .unwrap(),
    )
}

/// Restorer that returns a fixed result and counts its invocations
pub struct ScriptedRestorer {
    pub output: EnhanceOutput,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedRestorer {
    pub fn new(output: EnhanceOutput) -> (Box<dyn FaceRestorer>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let restorer = Self {
            output,
            calls: Arc::clone(&calls),
        };
        (Box::new(restorer), calls)
    }
}

impl FaceRestorer for ScriptedRestorer {
    fn enhance(&mut self, _image: &DynamicImage, _params: &EnhanceParams) -> Result<EnhanceOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png).unwrap();
    cursor.into_inner()
}

pub fn png_base64(image: &DynamicImage) -> String {
    STANDARD.encode(png_bytes(image))
}

pub fn image_request(image: &DynamicImage) -> String {
    serde_json::json!({ "image": png_base64(image) }).to_string()
}

/// Decode the `processed_image` field of a removal response
pub fn processed_image(body: &serde_json::Value) -> DynamicImage {
    let encoded = body["processed_image"].as_str().unwrap();
    let bytes = STANDARD.decode(encoded).unwrap();
    image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap()
}
