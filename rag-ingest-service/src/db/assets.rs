//! Asset (uploaded file) records.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::Database;
use super::models::{Asset, AssetType, NewAsset};
use crate::error::{DatabaseError, ServiceResult};
use crate::store::AssetStore;

const ASSET_COLUMNS: &str =
    "id, project_id, asset_type, name, original_name, content_type, size_bytes, created_at";

impl AssetStore for Database {
    fn create_asset(&self, asset: &NewAsset) -> ServiceResult<Asset> {
        let conn = self.conn()?;

        let record = Asset {
            id: Uuid::new_v4().to_string(),
            project_id: asset.project_id.clone(),
            asset_type: asset.asset_type,
            name: asset.name.clone(),
            original_name: asset.original_name.clone(),
            content_type: asset.content_type.clone(),
            size_bytes: asset.size_bytes,
            created_at: Utc::now(),
        };

        conn.execute(
            r#"
            INSERT INTO assets (id, project_id, asset_type, name, original_name, content_type, size_bytes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.id,
                record.project_id,
                record.asset_type.as_str(),
                record.name,
                record.original_name,
                record.content_type,
                record.size_bytes as i64,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(record)
    }

    fn get_asset_by_name(&self, project_id: &str, name: &str) -> ServiceResult<Option<Asset>> {
        let conn = self.conn()?;

        conn.query_row(
            &format!(
                "SELECT {} FROM assets WHERE project_id = ?1 AND name = ?2",
                ASSET_COLUMNS
            ),
            params![project_id, name],
            Asset::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    fn list_project_assets(
        &self,
        project_id: &str,
        asset_type: AssetType,
    ) -> ServiceResult<Vec<Asset>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM assets WHERE project_id = ?1 AND asset_type = ?2 ORDER BY created_at, name",
                ASSET_COLUMNS
            ))
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map(params![project_id, asset_type.as_str()], Asset::from_row)
            .map_err(DatabaseError::Query)?;

        let mut assets = Vec::new();
        for row in rows {
            assets.push(row.map_err(DatabaseError::Query)?);
        }

        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProjectStore;

    fn new_asset(project_id: &str, name: &str) -> NewAsset {
        NewAsset {
            project_id: project_id.to_string(),
            asset_type: AssetType::File,
            name: name.to_string(),
            original_name: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            size_bytes: 42,
        }
    }

    #[test]
    fn test_create_and_get_by_name() {
        let db = Database::open_in_memory().unwrap();
        let project = db.get_or_create_project("p").unwrap();

        let created = db.create_asset(&new_asset(&project.id, "abc_notes.txt")).unwrap();
        let found = db
            .get_asset_by_name(&project.id, "abc_notes.txt")
            .unwrap()
            .unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.size_bytes, 42);
        assert_eq!(found.asset_type, AssetType::File);
        assert_eq!(found.content_type.as_deref(), Some("text/plain"));
        assert!(db.get_asset_by_name(&project.id, "missing").unwrap().is_none());
    }

    #[test]
    fn test_name_is_unique_within_project_only() {
        let db = Database::open_in_memory().unwrap();
        let p1 = db.get_or_create_project("p1").unwrap();
        let p2 = db.get_or_create_project("p2").unwrap();

        db.create_asset(&new_asset(&p1.id, "same")).unwrap();
        assert!(db.create_asset(&new_asset(&p1.id, "same")).is_err());
        db.create_asset(&new_asset(&p2.id, "same")).unwrap();
    }

    #[test]
    fn test_list_is_project_scoped() {
        let db = Database::open_in_memory().unwrap();
        let p1 = db.get_or_create_project("p1").unwrap();
        let p2 = db.get_or_create_project("p2").unwrap();

        db.create_asset(&new_asset(&p1.id, "a")).unwrap();
        db.create_asset(&new_asset(&p1.id, "b")).unwrap();
        db.create_asset(&new_asset(&p2.id, "c")).unwrap();

        let names: Vec<String> = db
            .list_project_assets(&p1.id, AssetType::File)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
    }
}
