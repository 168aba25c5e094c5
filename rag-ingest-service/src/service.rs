//! Upload, processing and listing workflows.
//!
//! `DataService` owns the components of the ingestion pipeline and is shared
//! by every request handler:
//! - Upload: validate, name, write to disk, record the asset
//! - Processing: extract, chunk and store the files of a project
//! - CRUD: list assets and chunks

mod crud;
mod processing;
mod upload;

pub use processing::{ProcessRequest, ProcessingOrchestrator};
pub use upload::UploadedFile;

use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::db::Database;
use crate::ingestion::ContentExtractor;
use crate::naming::FileNamer;
use crate::validation::FileValidator;

/// Main service coordinator
pub struct DataService {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    validator: FileValidator,
    namer: FileNamer,
    orchestrator: ProcessingOrchestrator,
}

impl DataService {
    /// Create a service over an already opened database
    pub fn new(config: Arc<AppConfig>, db: Arc<Database>) -> Self {
        let namer = FileNamer::new(config.storage.files_dir());
        let orchestrator = ProcessingOrchestrator::new(
            db.clone(),
            db.clone(),
            db.clone(),
            ContentExtractor::new(namer.clone()),
        );

        info!(
            files_dir = %config.storage.files_dir().display(),
            allowed_types = ?config.upload.allowed_types,
            max_file_size_bytes = config.upload.max_file_size_bytes,
            "Data service initialized"
        );

        Self {
            validator: FileValidator::new(&config.upload),
            namer,
            orchestrator,
            config,
            db,
        }
    }
}
