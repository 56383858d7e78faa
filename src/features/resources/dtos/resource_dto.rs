use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::error::AppError;
use crate::features::resources::models::{Resource, ResourceSource, ResourceType};
use crate::shared::types::{
    default_page, default_page_size, deserialize_nullable, PaginationQuery, SortDirection,
};
use crate::shared::validation::{is_http_url, normalize_folder_path};

/// Maximum length of a resource description
const MAX_DESCRIPTION_LENGTH: usize = 5000;

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    if !is_http_url(value) {
        return Err(
            ValidationError::new("url_scheme").with_message("url must use http or https".into())
        );
    }
    Ok(())
}

fn validate_folder_path(value: &str) -> Result<(), ValidationError> {
    normalize_folder_path(value)
        .map(|_| ())
        .map_err(|msg| ValidationError::new("folder_path").with_message(msg.into()))
}

/// Normalize an optional folder path, reporting bad input as a validation error
pub(crate) fn normalized_folder(raw: Option<&str>) -> Result<Option<String>, AppError> {
    match raw {
        Some(raw) => normalize_folder_path(raw).map_err(AppError::Validation),
        None => Ok(None),
    }
}

/// Trim free text; blank becomes `None`
pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Create an external link resource
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLinkResourceDto {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    #[schema(example = "District reading list")]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(
        url(message = "Invalid URL format"),
        custom(function = "validate_http_url")
    )]
    #[schema(example = "https://example.com/reading-list")]
    pub url: String,

    /// Slash-separated folder, e.g. "guides/onboarding"
    #[validate(custom(function = "validate_folder_path"))]
    pub folder_path: Option<String>,

    #[serde(default)]
    pub is_published: bool,
}

/// Partial update of a resource.
///
/// Absent fields are left alone; `null` clears `description` or `folder_path`.
/// `url` may only be set on link resources.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_update_resource"))]
pub struct UpdateResourceDto {
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub folder_path: Option<Option<String>>,

    #[validate(
        url(message = "Invalid URL format"),
        custom(function = "validate_http_url")
    )]
    pub url: Option<String>,
}

fn validate_update_resource(dto: &UpdateResourceDto) -> Result<(), ValidationError> {
    if let Some(Some(description)) = &dto.description {
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ValidationError::new("description").with_message(
                format!("description must not exceed {} characters", MAX_DESCRIPTION_LENGTH)
                    .into(),
            ));
        }
    }
    if let Some(Some(folder_path)) = &dto.folder_path {
        validate_folder_path(folder_path)?;
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPublishedDto {
    pub is_published: bool,
}

/// Upload resource request DTO for OpenAPI documentation.
/// The handler reads the multipart fields directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadResourceDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Display title, defaults to the file name
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = "guides/onboarding")]
    pub folder_path: Option<String>,
    /// "true" to publish right away
    #[schema(example = "false")]
    pub is_published: Option<String>,
}

/// A file upload collected from multipart form data
#[derive(Debug, Validate)]
pub struct ResourceUpload {
    pub data: Vec<u8>,

    #[validate(length(min = 1, max = 255))]
    pub original_filename: String,

    #[validate(length(min = 1, max = 255))]
    pub content_type: String,

    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_folder_path"))]
    pub folder_path: Option<String>,

    pub is_published: bool,
}

// =============================================================================
// QUERIES
// =============================================================================

/// Query params for the public resource list
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ResourceQueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,

    /// Case-insensitive search in title or description
    pub search: Option<String>,

    /// Filter by resource type
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,

    /// Filter by folder path
    pub folder_path: Option<String>,

    /// With `folder_path`, also include everything below that folder
    #[serde(default)]
    pub include_subfolders: bool,

    /// Sort direction on creation time (default: desc)
    #[serde(default)]
    pub sort: SortDirection,
}

impl ResourceQueryParams {
    /// Public listings only ever see published resources
    pub fn into_filter(self) -> Result<ResourceFilter, AppError> {
        Ok(ResourceFilter {
            pagination: PaginationQuery {
                page: self.page,
                page_size: self.page_size,
            },
            search: trimmed(self.search),
            resource_type: self.resource_type,
            folder_path: normalized_folder(self.folder_path.as_deref())?,
            include_subfolders: self.include_subfolders,
            is_published: Some(true),
            sort: self.sort,
        })
    }
}

/// Query params for the admin resource list
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AdminResourceQueryParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,

    /// Case-insensitive search in title or description
    pub search: Option<String>,

    /// Filter by resource type
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,

    /// Filter by folder path
    pub folder_path: Option<String>,

    /// With `folder_path`, also include everything below that folder
    #[serde(default)]
    pub include_subfolders: bool,

    /// Filter by publish state (none = all)
    pub is_published: Option<bool>,

    /// Sort direction on creation time (default: desc)
    #[serde(default)]
    pub sort: SortDirection,
}

impl AdminResourceQueryParams {
    pub fn into_filter(self) -> Result<ResourceFilter, AppError> {
        Ok(ResourceFilter {
            pagination: PaginationQuery {
                page: self.page,
                page_size: self.page_size,
            },
            search: trimmed(self.search),
            resource_type: self.resource_type,
            folder_path: normalized_folder(self.folder_path.as_deref())?,
            include_subfolders: self.include_subfolders,
            is_published: self.is_published,
            sort: self.sort,
        })
    }
}

/// Normalized list filter handed to the service
#[derive(Debug, Clone)]
pub struct ResourceFilter {
    pub pagination: PaginationQuery,
    pub search: Option<String>,
    pub resource_type: Option<ResourceType>,
    pub folder_path: Option<String>,
    pub include_subfolders: bool,
    pub is_published: Option<bool>,
    pub sort: SortDirection,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Storage details of a file resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResourceFileDto {
    pub original_filename: String,
    pub content_type: String,
    /// Size in bytes
    pub file_size: i64,
}

/// Resource as seen by clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResourceResponseDto {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// External link, or a time-limited download URL for files
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub folder_path: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    /// Present for file resources only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ResourceFileDto>,
}

impl ResourceResponseDto {
    /// `file_url` is the download URL to expose for file resources
    pub fn from_resource(resource: Resource, file_url: Option<String>) -> Self {
        let resource_type = resource.source.resource_type();
        let (url, file) = match resource.source {
            ResourceSource::Url(url) => (Some(url), None),
            ResourceSource::File(stored) => (
                file_url,
                Some(ResourceFileDto {
                    original_filename: stored.original_filename,
                    content_type: stored.content_type,
                    file_size: stored.file_size,
                }),
            ),
        };

        Self {
            id: resource.id,
            title: resource.title,
            description: resource.description,
            url,
            resource_type,
            folder_path: resource.folder_path,
            is_published: resource.is_published,
            created_at: resource.created_at,
            file,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FolderSummaryDto {
    pub folder_path: String,
    pub resource_count: i64,
}

/// Resources sharing one folder, for the HTML listing
#[derive(Debug, Clone, Serialize)]
pub struct ResourceFolderGroup {
    /// `None` for resources outside any folder
    pub folder: Option<String>,
    pub resources: Vec<ResourceResponseDto>,
}

impl ResourceFolderGroup {
    /// Group consecutive resources by folder, keeping input order
    pub fn group(resources: Vec<ResourceResponseDto>) -> Vec<Self> {
        let mut groups: Vec<Self> = Vec::new();
        for resource in resources {
            match groups.last_mut() {
                Some(group) if group.folder == resource.folder_path => {
                    group.resources.push(resource)
                }
                _ => groups.push(Self {
                    folder: resource.folder_path.clone(),
                    resources: vec![resource],
                }),
            }
        }
        groups
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResourceResponseDto {
    pub deleted: bool,
}

// =============================================================================
// UPLOAD RULES
// =============================================================================

/// Allowed MIME types for resource uploads
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "text/plain",
    "text/csv",
    "application/zip",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// Maximum resource file size in bytes (25MB)
pub const MAX_RESOURCE_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Media type without parameters, lowercased ("text/plain; charset=utf-8" -> "text/plain")
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Longest filename or content type kept on a stored resource
pub const MAX_STORED_NAME_LENGTH: usize = 255;

/// Cut an uploaded filename down to the stored length, keeping a short extension
pub fn shorten_filename(name: &str) -> String {
    let name = name.trim();
    if name.chars().count() <= MAX_STORED_NAME_LENGTH {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.chars().count() <= 16 => (stem, Some(ext)),
        _ => (name, None),
    };
    match ext {
        Some(ext) => {
            let keep = MAX_STORED_NAME_LENGTH - ext.chars().count() - 1;
            format!("{}.{}", stem.chars().take(keep).collect::<String>(), ext)
        }
        None => stem.chars().take(MAX_STORED_NAME_LENGTH).collect(),
    }
}

/// Content type as stored: kept verbatim when it fits, otherwise reduced to its media type
pub fn stored_content_type(content_type: &str) -> String {
    let content_type = content_type.trim();
    if content_type.chars().count() <= MAX_STORED_NAME_LENGTH {
        content_type.to_string()
    } else {
        essence(content_type)
    }
}

/// Check if a MIME type is allowed
pub fn is_mime_type_allowed(content_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&essence(content_type).as_str())
}

/// Object key extension for an upload
pub fn extension_for(content_type: &str, filename: &str) -> String {
    let known = match essence(content_type).as_str() {
        "application/pdf" => Some("pdf"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "text/plain" => Some("txt"),
        "text/csv" => Some("csv"),
        "application/zip" => Some("zip"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.ms-excel" => Some("xls"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some("xlsx"),
        "application/vnd.ms-powerpoint" => Some("ppt"),
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Some("pptx")
        }
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::resources::models::StoredFile;
    use serde_json::json;

    fn sample_link() -> Resource {
        Resource {
            id: Uuid::now_v7(),
            title: "Reading list".to_string(),
            description: None,
            source: ResourceSource::Url("https://example.com/list".to_string()),
            folder_path: None,
            is_published: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_link_response_has_exact_wire_keys() {
        let dto = ResourceResponseDto::from_resource(sample_link(), None);
        let value = serde_json::to_value(&dto).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "created_at",
                "description",
                "folder_path",
                "id",
                "is_published",
                "title",
                "type",
                "url"
            ]
        );
        assert_eq!(value["type"], "url");
        assert_eq!(value["url"], "https://example.com/list");
        assert!(value["description"].is_null());
    }

    #[test]
    fn test_file_response_uses_download_url() {
        let resource = Resource {
            source: ResourceSource::File(StoredFile {
                storage_key: "private/resources/2026/03/x.pdf".to_string(),
                original_filename: "handbook.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                file_size: 2048,
            }),
            ..sample_link()
        };
        let dto = ResourceResponseDto::from_resource(
            resource,
            Some("http://storage/signed".to_string()),
        );
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["url"], "http://storage/signed");
        assert_eq!(value["file"]["original_filename"], "handbook.pdf");
        assert!(!value.to_string().contains("private/resources"));
    }

    #[test]
    fn test_resource_contract_deserialization() {
        let base = json!({
            "id": "0195a3c2-7f00-7000-8000-000000000001",
            "title": "Guide",
            "url": "https://example.com",
            "type": "url",
            "is_published": false,
            "created_at": "2026-03-01T10:00:00Z"
        });

        let absent: ResourceResponseDto = serde_json::from_value(base.clone()).unwrap();
        assert_eq!(absent.resource_type, ResourceType::Url);
        assert_eq!(absent.description, None);
        assert_eq!(absent.folder_path, None);

        let mut with_null = base.clone();
        with_null["description"] = json!(null);
        with_null["folder_path"] = json!(null);
        assert!(serde_json::from_value::<ResourceResponseDto>(with_null).is_ok());

        let mut with_values = base.clone();
        with_values["description"] = json!("About the guide");
        with_values["folder_path"] = json!("guides");
        let dto: ResourceResponseDto = serde_json::from_value(with_values).unwrap();
        assert_eq!(dto.folder_path.as_deref(), Some("guides"));

        let mut bad_type = base;
        bad_type["type"] = json!("video");
        assert!(serde_json::from_value::<ResourceResponseDto>(bad_type).is_err());
    }

    #[test]
    fn test_create_link_validation() {
        let valid: CreateLinkResourceDto = serde_json::from_value(json!({
            "title": "Guide",
            "url": "https://example.com/guide",
            "folder_path": "guides/onboarding"
        }))
        .unwrap();
        assert!(valid.validate().is_ok());
        assert!(!valid.is_published);

        let bad_scheme = CreateLinkResourceDto {
            url: "ftp://example.com/file".to_string(),
            ..valid_copy(&valid)
        };
        assert!(bad_scheme.validate().is_err());

        let blank_title = CreateLinkResourceDto {
            title: "   ".to_string(),
            ..valid_copy(&valid)
        };
        assert!(blank_title.validate().is_err());

        let bad_folder = CreateLinkResourceDto {
            folder_path: Some("guides/../etc".to_string()),
            ..valid_copy(&valid)
        };
        assert!(bad_folder.validate().is_err());
    }

    fn valid_copy(dto: &CreateLinkResourceDto) -> CreateLinkResourceDto {
        CreateLinkResourceDto {
            title: dto.title.clone(),
            description: dto.description.clone(),
            url: dto.url.clone(),
            folder_path: dto.folder_path.clone(),
            is_published: dto.is_published,
        }
    }

    #[test]
    fn test_update_distinguishes_null_and_absent() {
        let dto: UpdateResourceDto =
            serde_json::from_value(json!({ "description": null, "title": "New" })).unwrap();
        assert_eq!(dto.description, Some(None));
        assert_eq!(dto.folder_path, None);
        assert!(dto.validate().is_ok());

        let too_long = UpdateResourceDto {
            description: Some(Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1))),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let bad_folder = UpdateResourceDto {
            folder_path: Some(Some("a//b".to_string())),
            ..Default::default()
        };
        assert!(bad_folder.validate().is_err());
    }

    #[test]
    fn test_query_params_normalize_filter() {
        let params: ResourceQueryParams = serde_json::from_value(json!({
            "type": "file",
            "folder_path": "/guides/",
            "search": "  "
        }))
        .unwrap();
        let filter = params.into_filter().unwrap();
        assert_eq!(filter.resource_type, Some(ResourceType::File));
        assert_eq!(filter.folder_path.as_deref(), Some("guides"));
        assert_eq!(filter.search, None);
        assert_eq!(filter.is_published, Some(true));
        assert_eq!(filter.pagination.limit(), 10);
    }

    #[test]
    fn test_group_by_folder_keeps_order() {
        let in_folder = |folder: Option<&str>| ResourceResponseDto {
            folder_path: folder.map(str::to_string),
            ..ResourceResponseDto::from_resource(sample_link(), None)
        };
        let groups = ResourceFolderGroup::group(vec![
            in_folder(None),
            in_folder(Some("guides")),
            in_folder(Some("guides")),
            in_folder(Some("maths")),
        ]);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].folder, None);
        assert_eq!(groups[1].folder.as_deref(), Some("guides"));
        assert_eq!(groups[1].resources.len(), 2);
    }

    #[test]
    fn test_long_upload_names_are_shortened() {
        let long_stem = "a".repeat(300);
        let shortened = shorten_filename(&format!("{}.pdf", long_stem));
        assert_eq!(shortened.chars().count(), MAX_STORED_NAME_LENGTH);
        assert!(shortened.ends_with(".pdf"));

        let no_ext = shorten_filename(&"ü".repeat(400));
        assert_eq!(no_ext.chars().count(), MAX_STORED_NAME_LENGTH);

        assert_eq!(shorten_filename(" notes.txt "), "notes.txt");

        assert_eq!(
            stored_content_type("text/plain; charset=utf-8"),
            "text/plain; charset=utf-8"
        );
        let padded = format!("text/plain; x={}", "y".repeat(300));
        assert_eq!(stored_content_type(&padded), "text/plain");
    }

    #[test]
    fn test_mime_rules() {
        assert!(is_mime_type_allowed("application/pdf"));
        assert!(is_mime_type_allowed("text/plain; charset=utf-8"));
        assert!(!is_mime_type_allowed("application/x-msdownload"));

        assert_eq!(extension_for("image/jpeg", "photo.jpeg"), "jpg");
        assert_eq!(extension_for("application/octet-stream", "notes.MD"), "md");
        assert_eq!(extension_for("application/octet-stream", "noext"), "bin");
    }
}
