//! File upload: validation, storage and asset creation.

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::db::{Asset, AssetType, NewAsset};
use crate::error::{ServiceError, ServiceResult};
use crate::service::DataService;
use crate::store::{AssetStore, ProjectStore};
use crate::validation::FileDescriptor;

/// A file received from a client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl DataService {
    /// Store an uploaded file and record it as an asset of `project_id`.
    ///
    /// Rejected files leave no bytes on disk and no asset record. If the
    /// write fails part way, the partial file is removed.
    pub async fn upload_file(&self, project_id: &str, file: UploadedFile) -> ServiceResult<Asset> {
        let descriptor = FileDescriptor {
            file_name: &file.file_name,
            content_type: file.content_type.as_deref(),
            size: file.data.len() as u64,
        };
        let content_type = match self.validator.validate(&descriptor) {
            Ok(content_type) => content_type,
            Err(rejection) => {
                info!(
                    project_id,
                    file_name = %file.file_name,
                    reason = %rejection,
                    "Upload rejected"
                );
                return Err(ServiceError::Rejected(rejection));
            }
        };

        let project = self.db.get_or_create_project(project_id)?;

        let generated = self
            .namer
            .generate(&file.file_name, &project.id)
            .map_err(|e| ServiceError::UploadFailed {
                message: format!("Failed to prepare storage path: {}", e),
            })?;

        if let Err(e) = write_file(&generated.path, &file.data).await {
            warn!(
                project_id,
                path = %generated.path.display(),
                error = %e,
                "Failed to write upload"
            );
            remove_partial(&generated.path).await;
            return Err(ServiceError::UploadFailed {
                message: e.to_string(),
            });
        }

        let asset = match self.db.create_asset(&NewAsset {
            project_id: project.id.clone(),
            asset_type: AssetType::File,
            name: generated.name.clone(),
            original_name: file.file_name.clone(),
            content_type: Some(content_type),
            size_bytes: file.data.len() as u64,
        }) {
            Ok(asset) => asset,
            Err(e) => {
                remove_partial(&generated.path).await;
                return Err(e);
            }
        };

        info!(
            project_id,
            asset_id = %asset.id,
            file_id = %asset.name,
            size = asset.size_bytes,
            content_type = asset.content_type.as_deref().unwrap_or_default(),
            "File uploaded"
        );

        Ok(asset)
    }
}

async fn write_file(path: &std::path::Path, data: &[u8]) -> std::io::Result<()> {
    let mut out = tokio::fs::File::create(path).await?;
    out.write_all(data).await?;
    out.flush().await?;
    out.sync_all().await
}

async fn remove_partial(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
    }
}
