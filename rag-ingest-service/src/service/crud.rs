//! Asset and chunk listing.

use crate::db::{Asset, AssetType, DataChunk};
use crate::error::{ServiceError, ServiceResult};
use crate::service::DataService;
use crate::store::{AssetStore, ChunkStore, ProjectStore};

impl DataService {
    /// List the files of a project. Unknown projects have none.
    pub fn list_assets(&self, project_id: &str) -> ServiceResult<Vec<Asset>> {
        match self.db.find_project(project_id)? {
            Some(project) => self.db.list_project_assets(&project.id, AssetType::File),
            None => Ok(Vec::new()),
        }
    }

    /// List stored chunks of a project, or of one file when `file_id` is set.
    pub fn list_chunks(
        &self,
        project_id: &str,
        file_id: Option<&str>,
    ) -> ServiceResult<Vec<DataChunk>> {
        let project = self.db.find_project(project_id)?;

        match (project, file_id) {
            (Some(project), None) => self.db.list_chunks_by_project(&project.id),
            (None, None) => Ok(Vec::new()),
            (project, Some(file_id)) => {
                let asset = match project {
                    Some(project) => self.db.get_asset_by_name(&project.id, file_id)?,
                    None => None,
                };
                let asset = asset.ok_or_else(|| ServiceError::FileIdNotFound {
                    project_id: project_id.to_string(),
                    file_id: file_id.to_string(),
                })?;
                self.db.list_chunks_by_asset(&asset.project_id, &asset.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::Database;
    use crate::service::{ProcessRequest, UploadedFile};
    use bytes::Bytes;
    use std::sync::Arc;

    fn service(dir: &std::path::Path) -> DataService {
        let mut config = AppConfig::default();
        config.storage.data_dir = dir.to_path_buf();
        DataService::new(Arc::new(config), Arc::new(Database::open_in_memory().unwrap()))
    }

    async fn upload(svc: &DataService, project_id: &str, body: &str) -> Asset {
        svc.upload_file(
            project_id,
            UploadedFile {
                file_name: "doc.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                data: Bytes::from(body.to_string()),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_project_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());

        assert!(svc.list_assets("nobody").unwrap().is_empty());
        assert!(svc.list_chunks("nobody", None).unwrap().is_empty());
        assert!(matches!(
            svc.list_chunks("nobody", Some("x")),
            Err(ServiceError::FileIdNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_chunks_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let first = upload(&svc, "proj", &"a".repeat(150)).await;
        upload(&svc, "proj", "b").await;

        svc.process_project(
            "proj",
            &ProcessRequest {
                file_id: None,
                chunk_size: 100,
                overlap_size: 20,
                do_reset: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(svc.list_assets("proj").unwrap().len(), 2);
        assert_eq!(svc.list_chunks("proj", None).unwrap().len(), 3);

        let chunks = svc.list_chunks("proj", Some(&first.name)).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.asset_id == first.id));
    }
}
