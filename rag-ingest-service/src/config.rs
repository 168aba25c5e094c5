//! Service configuration.
//!
//! Values come from an optional `config.{toml,yaml,json}` file, overridden by
//! `RAG_INGEST__*` environment variables. Every field has a default so the
//! service starts with no configuration at all.

mod loader;

pub use loader::load_config;

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_upload")]
    pub upload: UploadConfig,

    #[serde(default = "default_processing")]
    pub processing: ProcessingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Deadline applied to every request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("rag-ingest.db")
    }

    /// Root directory for uploaded files; each project gets a subdirectory.
    pub fn files_dir(&self) -> PathBuf {
        self.data_dir.join("files")
    }
}

/// Upload limits
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Accepted MIME types, compared on their essence (no parameters)
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,

    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
}

impl UploadConfig {
    /// Request body limit for the upload route.
    ///
    /// Leaves room for multipart framing so oversized files reach the
    /// validator instead of being cut off by the transport.
    pub fn body_limit(&self) -> usize {
        (self.max_file_size_bytes as usize).saturating_add(MULTIPART_SLACK_BYTES)
    }
}

/// Chunking defaults used when a process request omits them
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,

    #[serde(default = "default_overlap_size")]
    pub default_overlap_size: usize,
}

const MULTIPART_SLACK_BYTES: usize = 64 * 1024;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            upload: default_upload(),
            processing: default_processing(),
        }
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
        request_timeout_secs: default_request_timeout_secs(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_upload() -> UploadConfig {
    UploadConfig {
        allowed_types: default_allowed_types(),
        max_file_size_bytes: default_max_file_size_bytes(),
    }
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "text/plain".to_string(),
        "text/markdown".to_string(),
        "application/pdf".to_string(),
        "application/epub+zip".to_string(),
    ]
}

fn default_max_file_size_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_processing() -> ProcessingConfig {
    ProcessingConfig {
        default_chunk_size: default_chunk_size(),
        default_overlap_size: default_overlap_size(),
    }
}

fn default_chunk_size() -> usize {
    100
}

fn default_overlap_size() -> usize {
    20
}
