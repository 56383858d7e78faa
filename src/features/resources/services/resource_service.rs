use chrono::{Datelike, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::resources::dtos::{
    extension_for, normalized_folder, trimmed, CreateLinkResourceDto, FolderSummaryDto,
    ResourceFilter, ResourceFolderGroup, ResourceResponseDto, ResourceUpload,
    UpdateResourceDto,
};
use crate::features::resources::models::{Resource, ResourceRow, ResourceSource, ResourceType};
use crate::modules::storage::MinIOClient;

const RESOURCE_COLUMNS: &str = "id, title, description, type, url, storage_key, \
     original_filename, content_type, file_size, folder_path, is_published, created_at";

/// Upper bound on resources rendered on the HTML listing
const PAGE_LISTING_LIMIT: i64 = 500;

/// Grouped published resources for the HTML listing
#[derive(Debug)]
pub struct PublishedListing {
    pub groups: Vec<ResourceFolderGroup>,
    /// More than `PAGE_LISTING_LIMIT` resources are published, only the first ones are listed
    pub truncated: bool,
}

/// Keep at most `limit` rows, reporting whether any were dropped
fn cap_rows<T>(mut rows: Vec<T>, limit: usize) -> (Vec<T>, bool) {
    let truncated = rows.len() > limit;
    rows.truncate(limit);
    (rows, truncated)
}

/// Which resources a lookup may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    PublishedOnly,
    All,
}

/// Service for the resource library
pub struct ResourceService {
    pool: PgPool,
    storage: Arc<MinIOClient>,
}

impl ResourceService {
    pub fn new(pool: PgPool, storage: Arc<MinIOClient>) -> Self {
        Self { pool, storage }
    }

    /// Create an external link resource
    pub async fn create_link(
        &self,
        dto: CreateLinkResourceDto,
        user_id: &str,
    ) -> Result<ResourceResponseDto> {
        let folder_path = normalized_folder(dto.folder_path.as_deref())?;
        let id = Uuid::now_v7();

        let query = format!(
            r#"
            INSERT INTO resources (id, title, description, type, url, folder_path, is_published, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            RESOURCE_COLUMNS
        );

        let row: ResourceRow = sqlx::query_as(&query)
            .bind(id)
            .bind(dto.title.trim())
            .bind(trimmed(dto.description))
            .bind(ResourceType::Url)
            .bind(dto.url.trim())
            .bind(folder_path)
            .bind(dto.is_published)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        info!("Link resource created: id={}, by={}", row.id, user_id);

        self.to_response(Resource::try_from(row)?).await
    }

    /// Store an uploaded file and record it as a resource
    ///
    /// The object goes to `{private_prefix}/resources/{yyyy}/{mm}/{id}.{ext}`.
    pub async fn upload_file(
        &self,
        upload: ResourceUpload,
        user_id: &str,
    ) -> Result<ResourceResponseDto> {
        let folder_path = normalized_folder(upload.folder_path.as_deref())?;
        let id = Uuid::now_v7();
        let now = Utc::now();
        let extension = extension_for(&upload.content_type, &upload.original_filename);
        let path = format!(
            "resources/{}/{:02}/{}.{}",
            now.year(),
            now.month(),
            id,
            extension
        );
        let storage_key = self.storage.generate_key(&path);
        let file_size = upload.data.len() as i64;

        self.storage
            .upload(&storage_key, &upload.data, &upload.content_type)
            .await?;

        debug!("Resource file uploaded to storage: {}", storage_key);

        let query = format!(
            r#"
            INSERT INTO resources (
                id, title, description, type, storage_key, original_filename,
                content_type, file_size, folder_path, is_published, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            RESOURCE_COLUMNS
        );

        let inserted = sqlx::query_as::<_, ResourceRow>(&query)
            .bind(id)
            .bind(upload.title.trim())
            .bind(trimmed(upload.description))
            .bind(ResourceType::File)
            .bind(&storage_key)
            .bind(&upload.original_filename)
            .bind(&upload.content_type)
            .bind(file_size)
            .bind(folder_path)
            .bind(upload.is_published)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                // Don't leave an orphaned object behind
                if let Err(cleanup) = self.storage.delete(&storage_key).await {
                    warn!(
                        "Failed to remove orphaned upload '{}': {}",
                        storage_key, cleanup
                    );
                }
                return Err(AppError::Database(e));
            }
        };

        info!(
            "File resource created: id={}, key={}, size={}, by={}",
            row.id, storage_key, file_size, user_id
        );

        self.to_response(Resource::try_from(row)?).await
    }

    /// Get one resource
    pub async fn get(&self, id: Uuid, visibility: Visibility) -> Result<ResourceResponseDto> {
        let resource = self.find(id, visibility).await?;
        self.to_response(resource).await
    }

    /// List resources with pagination and filters
    pub async fn list(&self, filter: &ResourceFilter) -> Result<(Vec<ResourceResponseDto>, i64)> {
        let mut count_builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM resources");
        push_conditions(&mut count_builder, filter);
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM resources",
            RESOURCE_COLUMNS
        ));
        push_conditions(&mut builder, filter);
        let direction = filter.sort.as_sql();
        builder.push(format!(
            " ORDER BY created_at {}, id {} LIMIT ",
            direction, direction
        ));
        builder.push_bind(filter.pagination.limit());
        builder.push(" OFFSET ");
        builder.push_bind(filter.pagination.offset());

        let rows = builder
            .build_query_as::<ResourceRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut resources = Vec::with_capacity(rows.len());
        for row in rows {
            resources.push(self.to_response(Resource::try_from(row)?).await?);
        }

        Ok((resources, total))
    }

    /// Distinct folders of published resources with their resource counts
    pub async fn list_folders(&self) -> Result<Vec<FolderSummaryDto>> {
        let folders = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT folder_path, COUNT(*)
            FROM resources
            WHERE is_published = TRUE AND folder_path IS NOT NULL
            GROUP BY folder_path
            ORDER BY folder_path
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(folders
            .into_iter()
            .map(|(folder_path, resource_count)| FolderSummaryDto {
                folder_path,
                resource_count,
            })
            .collect())
    }

    /// Published resources grouped by folder, unfiled ones first
    pub async fn published_by_folder(&self) -> Result<PublishedListing> {
        let query = format!(
            r#"
            SELECT {}
            FROM resources
            WHERE is_published = TRUE
            ORDER BY folder_path ASC NULLS FIRST, title ASC
            LIMIT $1
            "#,
            RESOURCE_COLUMNS
        );

        // One extra row tells whether the listing was cut off
        let rows: Vec<ResourceRow> = sqlx::query_as(&query)
            .bind(PAGE_LISTING_LIMIT + 1)
            .fetch_all(&self.pool)
            .await?;

        let (rows, truncated) = cap_rows(rows, PAGE_LISTING_LIMIT as usize);
        if truncated {
            warn!(
                "Resource listing truncated to the first {} published resources",
                PAGE_LISTING_LIMIT
            );
        }

        let resources = rows
            .into_iter()
            .map(|row| {
                Resource::try_from(row).map(|r| ResourceResponseDto::from_resource(r, None))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PublishedListing {
            groups: ResourceFolderGroup::group(resources),
            truncated,
        })
    }

    /// Apply a partial update
    pub async fn update(&self, id: Uuid, dto: UpdateResourceDto) -> Result<ResourceResponseDto> {
        let existing = self.find(id, Visibility::All).await?;

        let url = match (&existing.source, dto.url) {
            (_, None) => None,
            (ResourceSource::Url(_), Some(url)) => Some(url.trim().to_string()),
            (ResourceSource::File(_), Some(_)) => {
                return Err(AppError::BadRequest(
                    "url can only be changed on link resources".to_string(),
                ))
            }
        };

        let title = dto
            .title
            .map(|t| t.trim().to_string())
            .unwrap_or(existing.title);
        let description = match dto.description {
            Some(description) => trimmed(description),
            None => existing.description,
        };
        let folder_path = match dto.folder_path {
            Some(folder_path) => normalized_folder(folder_path.as_deref())?,
            None => existing.folder_path,
        };

        let query = format!(
            r#"
            UPDATE resources
            SET title = $2,
                description = $3,
                folder_path = $4,
                url = COALESCE($5, url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            RESOURCE_COLUMNS
        );

        let row: ResourceRow = sqlx::query_as(&query)
            .bind(id)
            .bind(title)
            .bind(description)
            .bind(folder_path)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))?;

        info!("Resource updated: id={}", id);

        self.to_response(Resource::try_from(row)?).await
    }

    /// Publish or unpublish a resource
    pub async fn set_published(&self, id: Uuid, is_published: bool) -> Result<ResourceResponseDto> {
        let query = format!(
            r#"
            UPDATE resources
            SET is_published = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            RESOURCE_COLUMNS
        );

        let row: ResourceRow = sqlx::query_as(&query)
            .bind(id)
            .bind(is_published)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))?;

        info!("Resource {}: id={}", if is_published { "published" } else { "unpublished" }, id);

        self.to_response(Resource::try_from(row)?).await
    }

    /// Delete a resource, then its stored file if any
    ///
    /// A storage failure after the row is gone is only logged.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let query = format!("DELETE FROM resources WHERE id = $1 RETURNING {}", RESOURCE_COLUMNS);

        let row: ResourceRow = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))?;

        info!("Resource deleted: id={}", id);

        if let (ResourceType::File, Some(storage_key)) = (row.resource_type, row.storage_key) {
            match self.storage.delete(&storage_key).await {
                Ok(()) => debug!("Resource file removed from storage: {}", storage_key),
                Err(e) => warn!(
                    "Resource {} deleted but its file '{}' could not be removed: {}",
                    id, storage_key, e
                ),
            }
        }

        Ok(())
    }

    /// Where a download of a published resource should go
    pub async fn download_url(&self, id: Uuid) -> Result<String> {
        let resource = self.find(id, Visibility::PublishedOnly).await?;
        match resource.source {
            ResourceSource::Url(url) => Ok(url),
            ResourceSource::File(file) => {
                self.storage
                    .get_presigned_url(&file.storage_key, Some(&file.original_filename))
                    .await
            }
        }
    }

    async fn find(&self, id: Uuid, visibility: Visibility) -> Result<Resource> {
        let query = format!(
            "SELECT {} FROM resources WHERE id = $1 AND (is_published = TRUE OR $2)",
            RESOURCE_COLUMNS
        );

        let row: ResourceRow = sqlx::query_as(&query)
            .bind(id)
            .bind(visibility == Visibility::All)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))?;

        Resource::try_from(row)
    }

    async fn to_response(&self, resource: Resource) -> Result<ResourceResponseDto> {
        let file_url = match &resource.source {
            ResourceSource::File(file) => Some(
                self.storage
                    .get_presigned_url(&file.storage_key, None)
                    .await?,
            ),
            ResourceSource::Url(_) => None,
        };
        Ok(ResourceResponseDto::from_resource(resource, file_url))
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Resource with id {} not found", id))
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &ResourceFilter) {
    builder.push(" WHERE TRUE");

    if let Some(is_published) = filter.is_published {
        builder.push(" AND is_published = ").push_bind(is_published);
    }

    if let Some(resource_type) = filter.resource_type {
        builder.push(" AND type = ").push_bind(resource_type);
    }

    if let Some(folder_path) = &filter.folder_path {
        if filter.include_subfolders {
            builder
                .push(" AND (folder_path = ")
                .push_bind(folder_path.clone())
                .push(" OR folder_path LIKE ")
                .push_bind(format!("{}/%", escape_like(folder_path)))
                .push(")");
        } else {
            builder.push(" AND folder_path = ").push_bind(folder_path.clone());
        }
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{PaginationQuery, SortDirection};

    #[test]
    fn test_listing_cap_reports_truncation() {
        let (rows, truncated) = cap_rows(vec![1, 2, 3], 3);
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(!truncated);

        let (rows, truncated) = cap_rows(vec![1, 2, 3, 4], 3);
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(truncated);
    }

    fn filter() -> ResourceFilter {
        ResourceFilter {
            pagination: PaginationQuery {
                page: 1,
                page_size: 10,
            },
            search: None,
            resource_type: None,
            folder_path: None,
            include_subfolders: false,
            is_published: None,
            sort: SortDirection::Desc,
        }
    }

    fn conditions(filter: &ResourceFilter) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM resources");
        push_conditions(&mut builder, filter);
        builder.sql().to_string()
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_no_filters() {
        assert_eq!(conditions(&filter()), "SELECT 1 FROM resources WHERE TRUE");
    }

    #[test]
    fn test_all_filters_bind_values() {
        let filter = ResourceFilter {
            search: Some("algebra".to_string()),
            resource_type: Some(ResourceType::File),
            folder_path: Some("maths".to_string()),
            include_subfolders: true,
            is_published: Some(true),
            ..filter()
        };
        let sql = conditions(&filter);
        assert_eq!(
            sql,
            "SELECT 1 FROM resources WHERE TRUE AND is_published = $1 AND type = $2 \
             AND (folder_path = $3 OR folder_path LIKE $4) \
             AND (title ILIKE $5 OR description ILIKE $6)"
        );
        assert!(!sql.contains("algebra"));
    }

    #[test]
    fn test_exact_folder_match() {
        let filter = ResourceFilter {
            folder_path: Some("maths".to_string()),
            ..filter()
        };
        assert_eq!(
            conditions(&filter),
            "SELECT 1 FROM resources WHERE TRUE AND folder_path = $1"
        );
    }
}
