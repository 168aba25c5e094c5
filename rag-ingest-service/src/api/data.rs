//! Data API endpoints.
//!
//! Handlers for file upload, processing, and asset/chunk listing. Every
//! response carries a `signal` naming the outcome.

use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartError,
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::db::{Asset, DataChunk};
use crate::error::{ServiceError, ServiceResult};
use crate::service::{ProcessRequest, UploadedFile};
use crate::signal::Signal;
use crate::validation::Rejection;

use super::AppState;

/// Response for a stored upload
#[derive(Serialize)]
pub struct UploadResponse {
    pub signal: Signal,
    /// Storage name; pass it back as `file_id` to process this file alone
    pub file_id: String,
    pub asset_id: String,
}

/// Processing request body. Omitted fields take the configured defaults.
#[derive(Debug, Deserialize)]
pub struct ProcessBody {
    pub chunk_size: Option<usize>,
    pub overlap_size: Option<usize>,
    /// `1` deletes the project's existing chunks first
    pub do_reset: Option<u8>,
    pub file_id: Option<String>,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub signal: Signal,
    pub inserted_chunks: usize,
    pub processed_file: usize,
}

#[derive(Serialize)]
pub struct AssetsResponse {
    pub signal: Signal,
    pub assets: Vec<Asset>,
}

#[derive(Serialize)]
pub struct ChunksResponse {
    pub signal: Signal,
    pub chunks: Vec<DataChunk>,
}

#[derive(Deserialize)]
pub struct ListChunksParams {
    pub file_id: Option<String>,
}

/// Upload a file into a project
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    mut multipart: Multipart,
) -> ServiceResult<Json<UploadResponse>> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, e))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(|ct| ct.to_string());
        let data = field.bytes().await.map_err(|e| multipart_error(&state, e))?;

        upload = Some(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    let upload = upload.ok_or_else(|| ServiceError::UploadFailed {
        message: "Request has no `file` field".to_string(),
    })?;

    let asset = state.service.upload_file(&project_id, upload).await?;

    Ok(Json(UploadResponse {
        signal: Signal::FileUploadSuccess,
        file_id: asset.name,
        asset_id: asset.id,
    }))
}

/// Body-limit overruns surface as a size rejection; anything else is an upload failure.
fn multipart_error(state: &AppState, error: MultipartError) -> ServiceError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let upload = &state.service.config.upload;
        return ServiceError::Rejected(Rejection::SizeExceeded {
            size: upload.body_limit() as u64,
            max: upload.max_file_size_bytes,
        });
    }

    warn!(error = %error.body_text(), "Failed to read multipart upload");
    ServiceError::UploadFailed {
        message: error.body_text(),
    }
}

/// Chunk the files of a project
pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    body: Result<Json<ProcessBody>, JsonRejection>,
) -> ServiceResult<Json<ProcessResponse>> {
    let Json(body) = body.map_err(|rejection| {
        warn!(project_id = %project_id, error = %rejection.body_text(), "Rejected process request body");
        ServiceError::InvalidRequestBody {
            message: rejection.body_text(),
        }
    })?;
    let defaults = &state.service.config.processing;

    let request = ProcessRequest {
        file_id: body.file_id.filter(|id| !id.is_empty()),
        chunk_size: body.chunk_size.unwrap_or(defaults.default_chunk_size),
        overlap_size: body.overlap_size.unwrap_or(defaults.default_overlap_size),
        do_reset: body.do_reset.unwrap_or(0) != 0,
    };

    let summary = state.service.process_project(&project_id, &request).await?;

    Ok(Json(ProcessResponse {
        signal: Signal::ProcessingSuccess,
        inserted_chunks: summary.inserted_chunks,
        processed_file: summary.processed_files,
    }))
}

/// List the files of a project
pub async fn list_assets_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ServiceResult<Json<AssetsResponse>> {
    let assets = state.service.list_assets(&project_id)?;
    Ok(Json(AssetsResponse {
        signal: Signal::ListingSuccess,
        assets,
    }))
}

/// List stored chunks, optionally for one file
pub async fn list_chunks_handler(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(params): Query<ListChunksParams>,
) -> ServiceResult<Json<ChunksResponse>> {
    let chunks = state
        .service
        .list_chunks(&project_id, params.file_id.as_deref())?;
    Ok(Json(ChunksResponse {
        signal: Signal::ListingSuccess,
        chunks,
    }))
}
