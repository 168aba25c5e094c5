//! Response signals returned to API callers.

use serde::{Deserialize, Serialize};

/// Status code string identifying the outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "file_type_not_supported")]
    FileTypeNotSupported,
    #[serde(rename = "file_size_exceeded")]
    FileSizeExceeded,
    #[serde(rename = "file_upload_success")]
    FileUploadSuccess,
    #[serde(rename = "file_upload_failed")]
    FileUploadFailed,
    #[serde(rename = "processing_success")]
    ProcessingSuccess,
    #[serde(rename = "processing_failed")]
    ProcessingFailed,
    #[serde(rename = "not_found_files")]
    NoFilesError,
    #[serde(rename = "no_file_found_with_this_id")]
    FileIdError,
    #[serde(rename = "invalid_chunk_parameters")]
    InvalidChunkParameters,
    #[serde(rename = "invalid_request_body")]
    InvalidRequestBody,
    #[serde(rename = "store_write_failed")]
    StoreWriteFailed,
    #[serde(rename = "internal_error")]
    InternalError,
    #[serde(rename = "listing_success")]
    ListingSuccess,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::FileTypeNotSupported => "file_type_not_supported",
            Signal::FileSizeExceeded => "file_size_exceeded",
            Signal::FileUploadSuccess => "file_upload_success",
            Signal::FileUploadFailed => "file_upload_failed",
            Signal::ProcessingSuccess => "processing_success",
            Signal::ProcessingFailed => "processing_failed",
            Signal::NoFilesError => "not_found_files",
            Signal::FileIdError => "no_file_found_with_this_id",
            Signal::InvalidChunkParameters => "invalid_chunk_parameters",
            Signal::InvalidRequestBody => "invalid_request_body",
            Signal::StoreWriteFailed => "store_write_failed",
            Signal::InternalError => "internal_error",
            Signal::ListingSuccess => "listing_success",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
