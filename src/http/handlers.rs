//! Route handlers.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{ConnectInfo, Multipart, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::http::request::request_id;
use crate::http::response::{ApiError, HealthResponse, IndexResponse, RemovalResponse};
use crate::http::server::AppState;
use crate::intake::TempFile;
use crate::observability::metrics::{self, Outcome};

/// Multipart field carrying the upload.
pub const IMAGE_FIELD: &str = "image";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::now())
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse::default())
}

/// `POST /remove-bg`
///
/// Received → Validated → Stored → Processed → Cleaned → Responded.
pub async fn remove_bg(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RemovalResponse>, ApiError> {
    let started = Instant::now();
    let request_id = request_id(&headers).to_string();

    let result = remove_background(&state, &request_id, multipart).await;

    match &result {
        Ok(_) => {
            metrics::record_request(Outcome::Success);
            tracing::info!(
                request_id = %request_id,
                peer = %peer,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Background removed"
            );
        }
        Err(ApiError::MissingImage) => {
            metrics::record_request(Outcome::MissingImage);
            tracing::info!(request_id = %request_id, peer = %peer, "Request without image");
        }
        Err(e) => {
            metrics::record_request(e.outcome());
            tracing::error!(
                request_id = %request_id,
                peer = %peer,
                status = %e.status(),
                error = %e,
                "Background removal request failed"
            );
        }
    }

    result
}

async fn remove_background(
    state: &AppState,
    request_id: &str,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RemovalResponse>, ApiError> {
    let upload = intake(state, multipart).await?;
    tracing::info!(
        request_id = %request_id,
        path = %upload.path().display(),
        remover = %state.adapter.remover_name(),
        "Processing"
    );

    let image = state
        .adapter
        .process(upload)
        .await
        .map_err(|e| ApiError::processing(e, state.expose_error_details))?;

    Ok(Json(RemovalResponse::from(image)))
}

/// Store the first `image` file field. Non-multipart requests and plain text
/// `image` fields count as missing.
async fn intake(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<TempFile, ApiError> {
    let Ok(mut multipart) = multipart else {
        return Err(ApiError::MissingImage);
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) || field.file_name().is_none() {
            continue;
        }
        return state.store.store_field(field).await?.ok_or(ApiError::MissingImage);
    }

    Err(ApiError::MissingImage)
}
