//! Processing pipeline: resolve assets, optionally reset, extract, chunk and
//! store.
//!
//! Files are handled one at a time in resolution order. A file that cannot
//! be extracted or stored is logged and skipped. A file that extracts but
//! yields no chunks aborts the whole request; chunks stored for earlier
//! files in the same request are kept.
//!
//! Requests for the same project are serialized so a reset in one request
//! cannot interleave with inserts from another.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chunking::{ChunkParams, chunk_content};
use crate::db::{Asset, AssetType, NewChunk};
use crate::error::{ServiceError, ServiceResult, format_error_chain};
use crate::ingestion::ContentExtractor;
use crate::service::DataService;
use crate::store::{AssetStore, ChunkStore, ProjectStore};

/// Parameters of one processing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Storage name of a single asset; all project files when `None`
    pub file_id: Option<String>,
    pub chunk_size: usize,
    pub overlap_size: usize,
    pub do_reset: bool,
}

/// Counters returned by a successful run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub inserted_chunks: usize,
    pub processed_files: usize,
}

/// Coordinates extraction, chunking and storage for a project
pub struct ProcessingOrchestrator {
    projects: Arc<dyn ProjectStore>,
    assets: Arc<dyn AssetStore>,
    chunks: Arc<dyn ChunkStore>,
    extractor: ContentExtractor,
    /// One lock per external project id
    project_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ProcessingOrchestrator {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        assets: Arc<dyn AssetStore>,
        chunks: Arc<dyn ChunkStore>,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            projects,
            assets,
            chunks,
            extractor,
            project_locks: DashMap::new(),
        }
    }

    /// Process the files of `project_id` according to `request`.
    pub async fn process(
        &self,
        project_id: &str,
        request: &ProcessRequest,
    ) -> ServiceResult<ProcessingSummary> {
        // Checked before any write so a malformed request never resets.
        let params = ChunkParams::new(request.chunk_size, request.overlap_size)?;

        let lock = self
            .project_locks
            .entry(project_id.to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.process_locked(project_id, request, params).await
        };

        // Drop the entry once no other request holds or awaits it.
        drop(lock);
        self.project_locks
            .remove_if(project_id, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn process_locked(
        &self,
        project_id: &str,
        request: &ProcessRequest,
        params: ChunkParams,
    ) -> ServiceResult<ProcessingSummary> {
        let project = self.projects.get_or_create_project(project_id)?;
        let targets = self.resolve_assets(&project.id, project_id, request.file_id.as_deref())?;

        if request.do_reset {
            let deleted = self.chunks.delete_chunks_by_project(&project.id)?;
            info!(project_id, deleted, "Reset project chunks");
        }

        let mut summary = ProcessingSummary::default();

        for asset in &targets {
            let Some(content) = self.extractor.extract(asset).await else {
                warn!(
                    project_id,
                    asset_id = %asset.id,
                    file_id = %asset.name,
                    "Skipping file with no extractable content"
                );
                continue;
            };

            let drafts = chunk_content(&content, params, &asset.name);
            if drafts.is_empty() {
                error!(
                    project_id,
                    asset_id = %asset.id,
                    file_id = %asset.name,
                    chunk_size = params.chunk_size(),
                    overlap_size = params.overlap_size(),
                    "File produced no chunks, aborting request"
                );
                return Err(ServiceError::ProcessingFailed {
                    file_id: asset.name.clone(),
                });
            }

            let records: Vec<NewChunk> = drafts
                .into_iter()
                .map(|draft| NewChunk {
                    project_id: project.id.clone(),
                    asset_id: asset.id.clone(),
                    text: draft.text,
                    metadata: draft.metadata,
                    order: draft.order,
                })
                .collect();

            match self.chunks.insert_chunks(&records) {
                Ok(inserted) => {
                    debug!(
                        project_id,
                        asset_id = %asset.id,
                        inserted,
                        "Stored chunks for file"
                    );
                    summary.inserted_chunks += inserted;
                    summary.processed_files += 1;
                }
                Err(e) => {
                    error!(
                        project_id,
                        asset_id = %asset.id,
                        file_id = %asset.name,
                        error = %format_error_chain(&e),
                        "Failed to store chunks, skipping file"
                    );
                }
            }
        }

        info!(
            project_id,
            targets = targets.len(),
            processed_files = summary.processed_files,
            inserted_chunks = summary.inserted_chunks,
            reset = request.do_reset,
            "Processing complete"
        );

        Ok(summary)
    }

    fn resolve_assets(
        &self,
        project_key: &str,
        project_id: &str,
        file_id: Option<&str>,
    ) -> ServiceResult<Vec<Asset>> {
        match file_id {
            Some(file_id) => {
                let asset = self
                    .assets
                    .get_asset_by_name(project_key, file_id)?
                    .ok_or_else(|| ServiceError::FileIdNotFound {
                        project_id: project_id.to_string(),
                        file_id: file_id.to_string(),
                    })?;
                Ok(vec![asset])
            }
            None => {
                let assets = self.assets.list_project_assets(project_key, AssetType::File)?;
                if assets.is_empty() {
                    return Err(ServiceError::NoFiles {
                        project_id: project_id.to_string(),
                    });
                }
                Ok(assets)
            }
        }
    }
}

impl DataService {
    pub async fn process_project(
        &self,
        project_id: &str,
        request: &ProcessRequest,
    ) -> ServiceResult<ProcessingSummary> {
        self.orchestrator.process(project_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DataChunk, NewAsset};
    use crate::error::DatabaseError;
    use crate::naming::FileNamer;

    struct Fixture {
        _dir: tempfile::TempDir,
        db: Arc<Database>,
        namer: FileNamer,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let namer = FileNamer::new(dir.path().join("files"));
            Self {
                _dir: dir,
                db: Arc::new(Database::open_in_memory().unwrap()),
                namer,
            }
        }

        fn orchestrator(&self) -> ProcessingOrchestrator {
            self.orchestrator_with_chunks(self.db.clone())
        }

        fn orchestrator_with_chunks(&self, chunks: Arc<dyn ChunkStore>) -> ProcessingOrchestrator {
            ProcessingOrchestrator::new(
                self.db.clone(),
                self.db.clone(),
                chunks,
                ContentExtractor::new(self.namer.clone()),
            )
        }

        /// Store a file on disk and record it as an asset; returns the file id.
        fn add_file(&self, project_id: &str, original: &str, body: &str) -> String {
            let project = self.db.get_or_create_project(project_id).unwrap();
            let generated = self.namer.generate(original, &project.id).unwrap();
            std::fs::write(&generated.path, body).unwrap();
            self.record_asset(&project.id, &generated.name, original);
            generated.name
        }

        /// Record an asset whose file was never written.
        fn add_missing_file(&self, project_id: &str, name: &str) {
            let project = self.db.get_or_create_project(project_id).unwrap();
            self.record_asset(&project.id, name, name);
        }

        fn record_asset(&self, project_key: &str, name: &str, original: &str) {
            self.db
                .create_asset(&NewAsset {
                    project_id: project_key.to_string(),
                    asset_type: AssetType::File,
                    name: name.to_string(),
                    original_name: original.to_string(),
                    content_type: Some("text/plain".to_string()),
                    size_bytes: 0,
                })
                .unwrap();
        }

        fn chunks(&self, project_id: &str) -> Vec<DataChunk> {
            let project = self.db.find_project(project_id).unwrap().unwrap();
            self.db.list_chunks_by_project(&project.id).unwrap()
        }
    }

    fn request(chunk_size: usize, overlap_size: usize, do_reset: bool) -> ProcessRequest {
        ProcessRequest {
            file_id: None,
            chunk_size,
            overlap_size,
            do_reset,
        }
    }

    /// Chunk store whose inserts always fail
    struct FailingChunks(Arc<Database>);

    impl ChunkStore for FailingChunks {
        fn insert_chunks(&self, _chunks: &[NewChunk]) -> ServiceResult<usize> {
            Err(DatabaseError::WriteFailed(rusqlite::Error::InvalidQuery).into())
        }
        fn delete_chunks_by_project(&self, project_id: &str) -> ServiceResult<usize> {
            self.0.delete_chunks_by_project(project_id)
        }
        fn list_chunks_by_project(&self, project_id: &str) -> ServiceResult<Vec<DataChunk>> {
            self.0.list_chunks_by_project(project_id)
        }
        fn list_chunks_by_asset(
            &self,
            project_id: &str,
            asset_id: &str,
        ) -> ServiceResult<Vec<DataChunk>> {
            self.0.list_chunks_by_asset(project_id, asset_id)
        }
    }

    #[tokio::test]
    async fn test_processes_all_files() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", &"a".repeat(250));
        fx.add_file("proj", "b.txt", "short text");

        let summary = fx.orchestrator().process("proj", &request(100, 20, false)).await.unwrap();

        assert_eq!(summary.processed_files, 2);
        assert_eq!(summary.inserted_chunks, 5);
        assert_eq!(fx.chunks("proj").len(), 5);
    }

    #[tokio::test]
    async fn test_file_without_extension_is_processed() {
        let fx = Fixture::new();
        let file_id = fx.add_file("proj", "README", "Extensionless plain text.");

        let summary = fx.orchestrator().process("proj", &request(100, 20, false)).await.unwrap();

        assert_eq!(summary, ProcessingSummary { inserted_chunks: 1, processed_files: 1 });
        let chunks = fx.chunks("proj");
        assert_eq!(chunks[0].text, "Extensionless plain text.");
        assert_eq!(chunks[0].metadata["source"], serde_json::json!(file_id));
    }

    #[tokio::test]
    async fn test_single_file_by_id() {
        let fx = Fixture::new();
        let first = fx.add_file("proj", "a.txt", "first file");
        fx.add_file("proj", "b.txt", "second file");

        let req = ProcessRequest {
            file_id: Some(first.clone()),
            ..request(100, 20, false)
        };
        let summary = fx.orchestrator().process("proj", &req).await.unwrap();

        assert_eq!(summary, ProcessingSummary { inserted_chunks: 1, processed_files: 1 });
        let chunks = fx.chunks("proj");
        assert_eq!(chunks[0].text, "first file");
        assert_eq!(chunks[0].metadata["source"], serde_json::json!(first));
    }

    #[tokio::test]
    async fn test_orders_are_contiguous_per_file() {
        let fx = Fixture::new();
        let file_id = fx.add_file("proj", "a.txt", &"x".repeat(95));

        fx.orchestrator().process("proj", &request(10, 2, false)).await.unwrap();

        let project = fx.db.find_project("proj").unwrap().unwrap();
        let asset = fx.db.get_asset_by_name(&project.id, &file_id).unwrap().unwrap();
        let orders: Vec<u32> = fx
            .db
            .list_chunks_by_asset(&project.id, &asset.id)
            .unwrap()
            .iter()
            .map(|c| c.order)
            .collect();
        assert_eq!(orders, (1..=12).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_unknown_file_id() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", "content");

        let req = ProcessRequest {
            file_id: Some("nope_missing.txt".to_string()),
            ..request(100, 20, true)
        };
        let err = fx.orchestrator().process("proj", &req).await.unwrap_err();
        assert!(matches!(err, ServiceError::FileIdNotFound { .. }));
    }

    #[tokio::test]
    async fn test_project_without_files() {
        let fx = Fixture::new();

        let err = fx
            .orchestrator()
            .process("empty", &request(100, 20, false))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NoFiles { .. }));
        assert!(fx.chunks("empty").is_empty());
    }

    #[tokio::test]
    async fn test_reset_replaces_previous_run() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", &"a".repeat(250));
        let orchestrator = fx.orchestrator();

        orchestrator.process("proj", &request(100, 20, false)).await.unwrap();
        let before: Vec<String> = fx.chunks("proj").into_iter().map(|c| c.id).collect();
        assert_eq!(before.len(), 4);

        let summary = orchestrator.process("proj", &request(50, 10, true)).await.unwrap();
        let after = fx.chunks("proj");

        assert_eq!(summary.inserted_chunks, 7);
        assert_eq!(after.len(), 7);
        assert!(after.iter().all(|c| !before.contains(&c.id)));
    }

    #[tokio::test]
    async fn test_without_reset_chunks_accumulate() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", "hello");
        let orchestrator = fx.orchestrator();

        orchestrator.process("proj", &request(100, 20, false)).await.unwrap();
        orchestrator.process("proj", &request(100, 20, false)).await.unwrap();

        assert_eq!(fx.chunks("proj").len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_parameters_do_not_reset() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", "hello");
        let orchestrator = fx.orchestrator();
        orchestrator.process("proj", &request(100, 20, false)).await.unwrap();

        let err = orchestrator.process("proj", &request(10, 10, true)).await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidChunkParameters { .. }));
        assert_eq!(fx.chunks("proj").len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_skipped() {
        let fx = Fixture::new();
        fx.add_missing_file("proj", "gone_file.txt");
        fx.add_file("proj", "a.txt", "still here");

        let summary = fx.orchestrator().process("proj", &request(100, 20, false)).await.unwrap();

        assert_eq!(summary, ProcessingSummary { inserted_chunks: 1, processed_files: 1 });
    }

    #[tokio::test]
    async fn test_empty_file_aborts_but_keeps_earlier_chunks() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", "first file has text");
        let empty = fx.add_file("proj", "b.txt", "   \n");

        // Pin the resolution order to: a.txt, then the empty file.
        let project = fx.db.find_project("proj").unwrap().unwrap();
        let order: Vec<String> = fx
            .db
            .list_project_assets(&project.id, AssetType::File)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(order.last(), Some(&empty));

        let err = fx
            .orchestrator()
            .process("proj", &request(100, 20, false))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::ProcessingFailed { ref file_id } if *file_id == empty));
        assert_eq!(fx.chunks("proj").len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_skips_file() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", "content");
        let orchestrator = fx.orchestrator_with_chunks(Arc::new(FailingChunks(fx.db.clone())));

        let summary = orchestrator.process("proj", &request(100, 20, false)).await.unwrap();

        assert_eq!(summary, ProcessingSummary::default());
        assert!(fx.chunks("proj").is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_on_one_project() {
        let fx = Fixture::new();
        fx.add_file("proj", "a.txt", &"a".repeat(250));
        let orchestrator = Arc::new(fx.orchestrator());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.process("proj", &request(100, 20, true)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Each run resets before inserting, so exactly one run's chunks remain.
        assert_eq!(fx.chunks("proj").len(), 4);
        assert!(orchestrator.project_locks.is_empty());
    }

    #[tokio::test]
    async fn test_project_locks_are_released() {
        let fx = Fixture::new();
        fx.add_file("p1", "a.txt", "one");
        fx.add_file("p2", "b.txt", "two");
        let orchestrator = fx.orchestrator();

        orchestrator.process("p1", &request(100, 20, false)).await.unwrap();
        orchestrator.process("p2", &request(100, 20, false)).await.unwrap();
        orchestrator
            .process("p3", &request(100, 20, false))
            .await
            .unwrap_err();

        assert!(orchestrator.project_locks.is_empty());
    }
}
