//! Response bodies and error mapping.
//!
//! # Responsibilities
//! - Shape the JSON bodies of every endpoint
//! - Map intake and processing errors to HTTP status codes
//! - Keep remover error details out of client responses unless configured
//!
//! # Design Decisions
//! - Whole image is buffered into one JSON body; no streaming
//! - Missing upload is a bare `{ error }` body, all other failures carry `success: false`

use std::io;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::intake::IntakeError;
use crate::observability::metrics::Outcome;
use crate::processing::{ProcessedImage, ProcessingError};

pub const MISSING_IMAGE_MESSAGE: &str = "No image file uploaded!";
pub const SUCCESS_MESSAGE: &str = "Background removed successfully!";
pub const STORAGE_FAILURE_MESSAGE: &str = "Failed to store upload";
pub const GENERIC_PROCESSING_MESSAGE: &str = "Background removal failed";

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn now() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub endpoint: String,
    pub status: String,
}

impl Default for IndexResponse {
    fn default() -> Self {
        Self {
            message: "Background Removal API".to_string(),
            endpoint: "POST /remove-bg".to_string(),
            status: "running".to_string(),
        }
    }
}

/// Successful `POST /remove-bg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalResponse {
    pub success: bool,
    pub message: String,
    /// `data:image/png;base64,...`
    pub base64: String,
    #[serde(rename = "outputPath", default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl From<ProcessedImage> for RemovalResponse {
    fn from(image: ProcessedImage) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            base64: image.data_url(),
            output_path: image.output_path.map(|p| p.display().to_string()),
        }
    }
}

/// Any failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub error: String,
}

impl ErrorResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            error: error.into(),
        }
    }
}

/// Errors surfaced by `POST /remove-bg`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image file uploaded!")]
    MissingImage,
    #[error("invalid upload: {0}")]
    Upload(#[from] MultipartError),
    #[error("failed to store upload: {0}")]
    Storage(#[source] io::Error),
    #[error("{source}")]
    Processing {
        source: ProcessingError,
        client_message: String,
    },
}

impl ApiError {
    /// Wrap a processing failure, deciding now what the client may see.
    pub fn processing(source: ProcessingError, expose_details: bool) -> Self {
        let client_message = if expose_details {
            source.to_string()
        } else {
            GENERIC_PROCESSING_MESSAGE.to_string()
        };
        ApiError::Processing {
            source,
            client_message,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            ApiError::MissingImage => Outcome::MissingImage,
            ApiError::Upload(_) => Outcome::InvalidUpload,
            ApiError::Storage(_) => Outcome::StorageError,
            ApiError::Processing { .. } => Outcome::ProcessingError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage => StatusCode::BAD_REQUEST,
            ApiError::Upload(e) => e.status(),
            ApiError::Storage(_) | ApiError::Processing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Multipart(e) => ApiError::Upload(e),
            IntakeError::Io(e) => ApiError::Storage(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::MissingImage => ErrorResponse {
                success: None,
                error: MISSING_IMAGE_MESSAGE.to_string(),
            },
            ApiError::Upload(e) => ErrorResponse::failure(e.body_text()),
            ApiError::Storage(_) => ErrorResponse::failure(STORAGE_FAILURE_MESSAGE),
            ApiError::Processing { client_message, .. } => ErrorResponse::failure(client_message),
        };
        (status, Json(body)).into_response()
    }
}
