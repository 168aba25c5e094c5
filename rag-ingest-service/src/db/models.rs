//! Database model structs.
//!
//! This module contains the data structures for database records.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};

/// Processing scope, addressed externally by a caller-chosen identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let created_at_str: String = row.get(2)?;

        Ok(Self {
            id: row.get(0)?,
            external_id: row.get(1)?,
            created_at: parse_timestamp(&created_at_str),
        })
    }
}

/// Kind of asset attached to a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    File,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(AssetType::File),
            _ => None,
        }
    }
}

/// Uploaded file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub project_id: String,
    pub asset_type: AssetType,
    /// Storage identifier produced by the file namer, unique per project
    pub name: String,
    pub original_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let asset_type_str: String = row.get(2)?;
        let size_bytes: i64 = row.get(6)?;
        let created_at_str: String = row.get(7)?;

        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            asset_type: AssetType::parse(&asset_type_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    Type::Text,
                    format!("unknown asset type: {}", asset_type_str).into(),
                )
            })?,
            name: row.get(3)?,
            original_name: row.get(4)?,
            content_type: row.get(5)?,
            size_bytes: size_bytes as u64,
            created_at: parse_timestamp(&created_at_str),
        })
    }
}

/// Asset fields supplied by the caller; id and timestamp are assigned on insert
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub project_id: String,
    pub asset_type: AssetType,
    pub name: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

/// One persisted segment of extracted text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataChunk {
    pub id: String,
    pub project_id: String,
    pub asset_id: String,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// 1-based position within the source asset
    pub order: u32,
    pub created_at: DateTime<Utc>,
}

impl DataChunk {
    pub(crate) fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let metadata_str: Option<String> = row.get(4)?;
        let created_at_str: String = row.get(6)?;

        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            asset_id: row.get(2)?,
            text: row.get(3)?,
            metadata: metadata_str
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            order: row.get(5)?,
            created_at: parse_timestamp(&created_at_str),
        })
    }
}

/// Chunk ready to be inserted
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub project_id: String,
    pub asset_id: String,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub order: u32,
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
