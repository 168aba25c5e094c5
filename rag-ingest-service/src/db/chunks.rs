//! Chunk bulk insert, listing, and reset.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use super::Database;
use super::models::{DataChunk, NewChunk};
use crate::error::{DatabaseError, ServiceResult};
use crate::store::ChunkStore;

const CHUNK_COLUMNS: &str = "id, project_id, asset_id, content, metadata, chunk_order, created_at";

impl ChunkStore for Database {
    fn insert_chunks(&self, chunks: &[NewChunk]) -> ServiceResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(DatabaseError::WriteFailed)?;
        let now = Utc::now().to_rfc3339();

        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO chunks (id, project_id, asset_id, content, metadata, chunk_order, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                )
                .map_err(DatabaseError::WriteFailed)?;

            for chunk in chunks {
                let metadata_json =
                    serde_json::to_string(&chunk.metadata).map_err(DatabaseError::Serialization)?;

                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    chunk.project_id,
                    chunk.asset_id,
                    chunk.text,
                    metadata_json,
                    chunk.order,
                    now,
                ])
                .map_err(DatabaseError::WriteFailed)?;
            }
        }

        // Dropping an uncommitted transaction rolls it back, so any early
        // return above leaves the table untouched.
        tx.commit().map_err(DatabaseError::WriteFailed)?;

        Ok(chunks.len())
    }

    fn delete_chunks_by_project(&self, project_id: &str) -> ServiceResult<usize> {
        let conn = self.conn()?;

        let rows = conn
            .execute("DELETE FROM chunks WHERE project_id = ?1", params![project_id])
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }

    fn list_chunks_by_project(&self, project_id: &str) -> ServiceResult<Vec<DataChunk>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!(
                r#"
                SELECT {}
                FROM chunks
                WHERE project_id = ?1
                ORDER BY asset_id, chunk_order
                "#,
                CHUNK_COLUMNS
            ))
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map(params![project_id], DataChunk::from_row)
            .map_err(DatabaseError::Query)?;

        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row.map_err(DatabaseError::Query)?);
        }

        Ok(chunks)
    }

    fn list_chunks_by_asset(
        &self,
        project_id: &str,
        asset_id: &str,
    ) -> ServiceResult<Vec<DataChunk>> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(&format!(
                r#"
                SELECT {}
                FROM chunks
                WHERE project_id = ?1 AND asset_id = ?2
                ORDER BY chunk_order
                "#,
                CHUNK_COLUMNS
            ))
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map(params![project_id, asset_id], DataChunk::from_row)
            .map_err(DatabaseError::Query)?;

        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row.map_err(DatabaseError::Query)?);
        }

        Ok(chunks)
    }
}
