//! Project lookup and get-or-create.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::Database;
use super::models::Project;
use crate::error::{DatabaseError, ServiceResult};
use crate::store::ProjectStore;

impl ProjectStore for Database {
    fn find_project(&self, external_id: &str) -> ServiceResult<Option<Project>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id, external_id, created_at FROM projects WHERE external_id = ?1",
            params![external_id],
            Project::from_row,
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    fn get_or_create_project(&self, external_id: &str) -> ServiceResult<Project> {
        let conn = self.conn()?;

        // The UNIQUE constraint on external_id makes the insert a no-op for
        // existing projects; both statements run under the connection lock.
        conn.execute(
            "INSERT INTO projects (id, external_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(external_id) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                external_id,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(DatabaseError::Query)?;

        conn.query_row(
            "SELECT id, external_id, created_at FROM projects WHERE external_id = ?1",
            params![external_id],
            Project::from_row,
        )
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }
}
