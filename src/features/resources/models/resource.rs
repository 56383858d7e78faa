use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::AppError;

/// Resource kind matching the `resource_type` database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "resource_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Uploaded file kept in object storage
    File,
    /// External link
    Url,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::File => write!(f, "file"),
            ResourceType::Url => write!(f, "url"),
        }
    }
}

/// Database row for a resource
#[derive(Debug, Clone, FromRow)]
pub struct ResourceRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    pub resource_type: ResourceType,
    pub url: Option<String>,
    pub storage_key: Option<String>,
    pub original_filename: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<i64>,
    pub folder_path: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// Object storage data of an uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub storage_key: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
}

/// Where a resource's content lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    File(StoredFile),
    Url(String),
}

impl ResourceSource {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceSource::File(_) => ResourceType::File,
            ResourceSource::Url(_) => ResourceType::Url,
        }
    }
}

/// A resource whose source always agrees with its type
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub source: ResourceSource,
    pub folder_path: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ResourceRow> for Resource {
    type Error = AppError;

    fn try_from(row: ResourceRow) -> Result<Self, Self::Error> {
        let source = match row.resource_type {
            ResourceType::Url => match (row.url, row.storage_key) {
                (Some(url), None) => ResourceSource::Url(url),
                _ => return Err(inconsistent(row.id, row.resource_type)),
            },
            ResourceType::File => match (
                row.url,
                row.storage_key,
                row.original_filename,
                row.content_type,
                row.file_size,
            ) {
                (None, Some(storage_key), Some(original_filename), Some(content_type), Some(file_size)) => {
                    ResourceSource::File(StoredFile {
                        storage_key,
                        original_filename,
                        content_type,
                        file_size,
                    })
                }
                _ => return Err(inconsistent(row.id, row.resource_type)),
            },
        };

        Ok(Resource {
            id: row.id,
            title: row.title,
            description: row.description,
            source,
            folder_path: row.folder_path,
            is_published: row.is_published,
            created_at: row.created_at,
        })
    }
}

fn inconsistent(id: Uuid, resource_type: ResourceType) -> AppError {
    AppError::Internal(format!(
        "Resource {} has columns that contradict its type '{}'",
        id, resource_type
    ))
}
