use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::signal::Signal;
use crate::validation::Rejection;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Upload rejected: {0}")]
    Rejected(Rejection),

    #[error("Upload failed: {message}")]
    UploadFailed { message: String },

    #[error("No file found with id {file_id} in project {project_id}")]
    FileIdNotFound { project_id: String, file_id: String },

    #[error("Project {project_id} has no files to process")]
    NoFiles { project_id: String },

    #[error("Invalid chunk parameters: chunk_size={chunk_size}, overlap_size={overlap_size}")]
    InvalidChunkParameters {
        chunk_size: usize,
        overlap_size: usize,
    },

    #[error("Malformed request body: {message}")]
    InvalidRequestBody { message: String },

    #[error("File {file_id} produced no chunks")]
    ProcessingFailed { file_id: String },

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Document processing failed")]
    Processing(#[from] ProcessingError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Bulk write failed, batch rolled back")]
    WriteFailed(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed")]
    Serialization(#[source] serde_json::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Document processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to extract text from page {page}")]
    TextExtraction {
        page: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read EPUB: {0}")]
    EpubRead(String),

    #[error("Unsupported file format: {format}")]
    UnsupportedFormat { format: String },

    #[error("IO error")]
    Io(#[source] std::io::Error),
}

/// Body returned for every failed request
#[derive(Serialize)]
pub struct ErrorResponse {
    pub signal: Signal,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Rejected(_)
            | ServiceError::UploadFailed { .. }
            | ServiceError::FileIdNotFound { .. }
            | ServiceError::NoFiles { .. }
            | ServiceError::InvalidChunkParameters { .. }
            | ServiceError::InvalidRequestBody { .. }
            | ServiceError::ProcessingFailed { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn signal(&self) -> Signal {
        match self {
            ServiceError::Rejected(Rejection::UnsupportedType { .. }) => Signal::FileTypeNotSupported,
            ServiceError::Rejected(Rejection::SizeExceeded { .. }) => Signal::FileSizeExceeded,
            ServiceError::UploadFailed { .. } => Signal::FileUploadFailed,
            ServiceError::FileIdNotFound { .. } => Signal::FileIdError,
            ServiceError::NoFiles { .. } => Signal::NoFilesError,
            ServiceError::InvalidChunkParameters { .. } => Signal::InvalidChunkParameters,
            ServiceError::InvalidRequestBody { .. } => Signal::InvalidRequestBody,
            ServiceError::ProcessingFailed { .. } => Signal::ProcessingFailed,
            ServiceError::Database(DatabaseError::WriteFailed(_)) => Signal::StoreWriteFailed,
            _ => Signal::InternalError,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %format_error_chain(&self), "Request failed");
        }

        (status, Json(ErrorResponse { signal: self.signal() })).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error and all of its sources as one line.
pub fn format_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
