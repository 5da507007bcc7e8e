use crate::error::{ErrorKind, RetouchError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error returned by every handler, rendered as `{"error": "<message>"}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    source: Option<RetouchError>,
}

impl ApiError {
    /// An error that does not originate from a library call
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// HTTP status for an error kind
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingInput | ErrorKind::InvalidFormat => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ModelUnavailable | ErrorKind::ProcessingFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}

/// Render an error and all of its sources, outermost first
#[must_use]
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

impl From<RetouchError> for ApiError {
    fn from(error: RetouchError) -> Self {
        Self {
            status: status_for(error.kind()),
            message: error.to_string(),
            source: Some(error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = self.status.as_u16(),
                    error = %error_chain(source),
                    "Request failed"
                ),
                None => tracing::error!(
                    status = self.status.as_u16(),
                    error = %self.message,
                    "Request failed"
                ),
            }
        } else {
            tracing::debug!(status = self.status.as_u16(), error = %self.message, "Request rejected");
        }

        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RetouchError::missing_input("No file uploaded"), 400),
            (RetouchError::invalid_format("Invalid image format"), 400),
            (RetouchError::not_found("x.jpg"), 404),
            (RetouchError::model_unavailable("Face restoration model not loaded"), 500),
            (RetouchError::restoration_failed("Restoration failed - null result"), 500),
            (RetouchError::inference("boom"), 500),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status().as_u16(), expected);
        }
    }

    #[test]
    fn test_message_is_the_error_display() {
        let error = ApiError::from(RetouchError::missing_input("No image data provided"));
        assert_eq!(error.message(), "No image data provided");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let error = RetouchError::file_io_error("write upload", "/tmp/a.png", &io);
        let chain = error_chain(&error);
        assert!(chain.contains("write upload"));
        assert!(chain.contains("disk full"));
    }
}
