//! Route handlers
//!
//! Handlers validate and decode on the async side, then move model work onto
//! the blocking pool. Each model sits behind a mutex, so concurrent requests
//! for the same model run one after another.

use super::{
    error::ApiError,
    state::{lock_model, AppState},
};
use crate::{
    config::OutputFormat,
    error::{Result, RetouchError},
    services::{upload_names, ImageIOService, OutputFormatHandler},
    threshold,
    tracing_config::spans,
};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use image::GenericImageView;
use serde_json::{json, Value};
use tracing::{info, warn, Instrument, Span};
use uuid::Uuid;

/// Run `task` on the blocking pool inside the current span
///
/// A panic in the task surfaces as a 500 instead of tearing down the worker.
async fn run_blocking<T, F>(task: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(task))
        .await
        .map_err(|e| RetouchError::internal(format!("Processing task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Pull the `image` string out of a JSON body
fn image_field(body: &[u8]) -> Result<String> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| value.get("image")?.as_str().map(str::to_owned))
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| RetouchError::missing_input("No image data provided"))
}

/// `POST /remove-background`
pub(super) async fn remove_background(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let payload = image_field(&body)?;
    let image = ImageIOService::load_from_base64(&payload)?;

    let matting = state
        .matting
        .clone()
        .ok_or_else(|| RetouchError::model_unavailable("Background removal model not loaded"))?;

    let span = spans::background_removal("matting", image.dimensions());
    let encoded = run_blocking(move || {
        let result = lock_model(&matting).process_image(&image)?;
        OutputFormatHandler::to_base64_png(result.image)
    })
    .instrument(span)
    .await?;

    Ok(Json(json!({ "processed_image": encoded })))
}

/// `POST /remove-background-opencv`
pub(super) async fn remove_background_threshold(
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let payload = image_field(&body)?;
    let image = ImageIOService::load_from_base64(&payload)?;

    let span = spans::background_removal("threshold", image.dimensions());
    let encoded =
        run_blocking(move || OutputFormatHandler::to_base64_png(threshold::remove_background(&image)))
            .instrument(span)
            .await?;

    Ok(Json(json!({ "processed_image": encoded })))
}

/// The `file` part of a multipart form
struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

async fn read_file_field(
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<UploadedFile, ApiError> {
    let Ok(mut multipart) = multipart else {
        return Err(RetouchError::missing_input("No file uploaded").into());
    };

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        let Some(field) = field else {
            return Err(RetouchError::missing_input("No file uploaded").into());
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        return Ok(UploadedFile { file_name, bytes });
    }
}

/// `POST /restore`
pub(super) async fn restore(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Response, ApiError> {
    let upload = read_file_field(multipart).await?;
    let names = upload_names(&upload.file_name, Uuid::new_v4())?;

    let span = spans::restoration(&names.upload);
    let upload_path = state.upload_dir.join(&names.upload);
    let restored_path = state.results_dir.join(&names.restored);

    let image = run_blocking(move || {
        ImageIOService::save_bytes(&upload.bytes, &upload_path)?;
        ImageIOService::load_image(&upload_path).map_err(|e| match e {
            RetouchError::InvalidFormat(detail) => {
                warn!(path = %upload_path.display(), %detail, "Uploaded file is not a readable image");
                RetouchError::invalid_format("Invalid image format")
            },
            other => other,
        })
    })
    .instrument(span.clone())
    .await?;

    let restorer = state
        .restorer
        .clone()
        .ok_or_else(|| RetouchError::model_unavailable("Face restoration model not loaded"))?;
    let params = state.enhance;
    let quality = state.jpeg_quality;

    let bytes = run_blocking(move || {
        let output = lock_model(&restorer).enhance(&image, &params)?;
        let restored = output.into_restored_image()?;
        let bytes = OutputFormatHandler::encode(&restored, OutputFormat::Jpeg, quality)?;
        ImageIOService::save_bytes(&bytes, &restored_path)?;
        info!(path = %restored_path.display(), bytes = bytes.len(), "Restored image written");
        Ok(bytes)
    })
    .instrument(span)
    .await?;

    Ok((
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            OutputFormatHandler::content_type(OutputFormat::Jpeg),
        )],
        bytes,
    )
        .into_response())
}

/// `GET /health`
pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "started_at": state.started_at.to_rfc3339(),
        "models": {
            "matting": state.matting.is_some(),
            "restoration": state.restorer.is_some(),
        },
    }))
}

/// Fallback for files missing from the results directory
pub(super) async fn restored_file_not_found() -> ApiError {
    RetouchError::not_found("restored image").into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_field_extraction() {
        assert_eq!(image_field(br#"{"image": "abc"}"#).unwrap(), "abc");

        for body in [
            &b""[..],
            b"not json",
            b"[1, 2, 3]",
            br#"{"picture": "abc"}"#,
            br#"{"image": 42}"#,
            br#"{"image": "   "}"#,
        ] {
            let err = image_field(body).unwrap_err();
            assert_eq!(err.to_string(), "No image data provided");
        }
    }
}
