//! Storage interfaces consumed by the upload and processing pipelines.
//!
//! [`Database`](crate::db::Database) implements all three traits. The
//! orchestrator receives them as trait objects at construction so tests can
//! substitute failing or recording stores.
//!
//! Implementations must be `Send + Sync`; calls are short and synchronous.

use crate::db::{Asset, AssetType, DataChunk, NewAsset, NewChunk, Project};
use crate::error::ServiceResult;

/// Project lookup and lazy creation
pub trait ProjectStore: Send + Sync {
    /// Find a project by its external identifier.
    fn find_project(&self, external_id: &str) -> ServiceResult<Option<Project>>;

    /// Return the project for `external_id`, creating it if absent.
    ///
    /// Atomic: concurrent first access yields one project.
    fn get_or_create_project(&self, external_id: &str) -> ServiceResult<Project>;
}

/// Uploaded file metadata, scoped by project
pub trait AssetStore: Send + Sync {
    fn create_asset(&self, asset: &NewAsset) -> ServiceResult<Asset>;

    fn get_asset_by_name(&self, project_id: &str, name: &str) -> ServiceResult<Option<Asset>>;

    /// Assets of one type, oldest first.
    fn list_project_assets(
        &self,
        project_id: &str,
        asset_type: AssetType,
    ) -> ServiceResult<Vec<Asset>>;
}

/// Chunk persistence, scoped by project and source asset
pub trait ChunkStore: Send + Sync {
    /// Insert all chunks or none of them. Returns the number inserted.
    fn insert_chunks(&self, chunks: &[NewChunk]) -> ServiceResult<usize>;

    /// Remove every chunk of a project. Returns the number removed.
    fn delete_chunks_by_project(&self, project_id: &str) -> ServiceResult<usize>;

    fn list_chunks_by_project(&self, project_id: &str) -> ServiceResult<Vec<DataChunk>>;

    fn list_chunks_by_asset(&self, project_id: &str, asset_id: &str)
    -> ServiceResult<Vec<DataChunk>>;
}
