use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireContentManager;
use crate::features::resources::dtos::{
    is_mime_type_allowed, shorten_filename, stored_content_type, AdminResourceQueryParams,
    CreateLinkResourceDto, DeleteResourceResponseDto, FolderSummaryDto, ResourceQueryParams,
    ResourceResponseDto, ResourceUpload, SetPublishedDto, UpdateResourceDto, UploadResourceDto,
    ALLOWED_MIME_TYPES, MAX_RESOURCE_FILE_SIZE,
};
use crate::features::resources::services::{ResourceService, Visibility};
use crate::shared::types::{ApiResponse, Meta};

// =============================================================================
// PUBLIC
// =============================================================================

/// List published resources
#[utoipa::path(
    get,
    path = "/api/resources",
    params(ResourceQueryParams),
    responses(
        (status = 200, description = "Resources retrieved successfully", body = ApiResponse<Vec<ResourceResponseDto>>),
        (status = 400, description = "Invalid filter")
    ),
    tag = "resources"
)]
pub async fn list_resources(
    State(service): State<Arc<ResourceService>>,
    AppQuery(params): AppQuery<ResourceQueryParams>,
) -> Result<Json<ApiResponse<Vec<ResourceResponseDto>>>> {
    let filter = params.into_filter()?;
    let (resources, total) = service.list(&filter).await?;
    Ok(Json(ApiResponse::success(
        Some(resources),
        None,
        Some(Meta { total }),
    )))
}

/// List folders that hold published resources
#[utoipa::path(
    get,
    path = "/api/resources/folders",
    responses(
        (status = 200, description = "Folders retrieved successfully", body = ApiResponse<Vec<FolderSummaryDto>>)
    ),
    tag = "resources"
)]
pub async fn list_folders(
    State(service): State<Arc<ResourceService>>,
) -> Result<Json<ApiResponse<Vec<FolderSummaryDto>>>> {
    let folders = service.list_folders().await?;
    Ok(Json(ApiResponse::success(Some(folders), None, None)))
}

/// Get a published resource
#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    params(
        ("id" = Uuid, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Resource retrieved successfully", body = ApiResponse<ResourceResponseDto>),
        (status = 404, description = "Resource not found")
    ),
    tag = "resources"
)]
pub async fn get_resource(
    State(service): State<Arc<ResourceService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    let resource = service.get(id, Visibility::PublishedOnly).await?;
    Ok(Json(ApiResponse::success(Some(resource), None, None)))
}

/// Redirect to a published resource's content
///
/// Files redirect to a short-lived download URL, links to their target.
#[utoipa::path(
    get,
    path = "/api/resources/{id}/download",
    params(
        ("id" = Uuid, Path, description = "Resource ID")
    ),
    responses(
        (status = 302, description = "Redirect to the resource content"),
        (status = 404, description = "Resource not found")
    ),
    tag = "resources"
)]
pub async fn download_resource(
    State(service): State<Arc<ResourceService>>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    let url = service.download_url(id).await?;
    let location = HeaderValue::try_from(url)
        .map_err(|e| AppError::Internal(format!("Invalid redirect target: {}", e)))?;

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

// =============================================================================
// ADMIN
// =============================================================================

/// List all resources, published or not (content managers)
#[utoipa::path(
    get,
    path = "/api/admin/resources",
    params(AdminResourceQueryParams),
    responses(
        (status = 200, description = "Resources retrieved successfully", body = ApiResponse<Vec<ResourceResponseDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Forbidden - content manager only")
    ),
    tag = "resources",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn admin_list_resources(
    RequireContentManager(_user): RequireContentManager,
    State(service): State<Arc<ResourceService>>,
    AppQuery(params): AppQuery<AdminResourceQueryParams>,
) -> Result<Json<ApiResponse<Vec<ResourceResponseDto>>>> {
    let filter = params.into_filter()?;
    let (resources, total) = service.list(&filter).await?;
    Ok(Json(ApiResponse::success(
        Some(resources),
        None,
        Some(Meta { total }),
    )))
}

/// Get any resource (content managers)
#[utoipa::path(
    get,
    path = "/api/admin/resources/{id}",
    params(
        ("id" = Uuid, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Resource retrieved successfully", body = ApiResponse<ResourceResponseDto>),
        (status = 403, description = "Forbidden - content manager only"),
        (status = 404, description = "Resource not found")
    ),
    tag = "resources",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn admin_get_resource(
    RequireContentManager(_user): RequireContentManager,
    State(service): State<Arc<ResourceService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    let resource = service.get(id, Visibility::All).await?;
    Ok(Json(ApiResponse::success(Some(resource), None, None)))
}

/// Create a link resource (content managers)
#[utoipa::path(
    post,
    path = "/api/admin/resources",
    request_body = CreateLinkResourceDto,
    responses(
        (status = 201, description = "Resource created successfully", body = ApiResponse<ResourceResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - content manager only")
    ),
    tag = "resources",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_link_resource(
    RequireContentManager(user): RequireContentManager,
    State(service): State<Arc<ResourceService>>,
    AppJson(dto): AppJson<CreateLinkResourceDto>,
) -> Result<(StatusCode, Json<ApiResponse<ResourceResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let resource = service.create_link(dto, &user.sub).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(resource), None, None)),
    ))
}

/// Upload a file resource (content managers)
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `title`: Display title (optional, defaults to the file name)
/// - `description`, `folder_path`: optional
/// - `is_published`: "true" to publish immediately
#[utoipa::path(
    post,
    path = "/api/admin/resources/upload",
    request_body(
        content = UploadResourceDto,
        content_type = "multipart/form-data",
        description = "File upload form with optional title, description, folder_path and is_published fields",
    ),
    responses(
        (status = 201, description = "Resource uploaded successfully", body = ApiResponse<ResourceResponseDto>),
        (status = 400, description = "Invalid file or validation error"),
        (status = 403, description = "Forbidden - content manager only"),
        (status = 413, description = "File too large")
    ),
    tag = "resources",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_resource(
    RequireContentManager(user): RequireContentManager,
    State(service): State<Arc<ResourceService>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ResourceResponseDto>>)> {
    let upload = read_upload(multipart).await?;

    upload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let resource = service.upload_file(upload, &user.sub).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(resource), None, None)),
    ))
}

async fn read_upload(mut multipart: Multipart) -> Result<ResourceUpload> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut folder_path: Option<String> = None;
    let mut is_published = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart data", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let content_type = field
                    .content_type()
                    .map(stored_content_type)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let file_name = field
                    .file_name()
                    .map(shorten_filename)
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| "unnamed".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read file data", e))?;
                file = Some((data.to_vec(), file_name, content_type));
            }
            "title" | "description" | "folder_path" | "is_published" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read {} field: {}", field_name, e))
                })?;
                let text = text.trim().to_string();
                match field_name.as_str() {
                    "title" => title = Some(text).filter(|t| !t.is_empty()),
                    "description" => description = Some(text).filter(|t| !t.is_empty()),
                    "folder_path" => folder_path = Some(text).filter(|t| !t.is_empty()),
                    _ => is_published = matches!(text.to_ascii_lowercase().as_str(), "true" | "on" | "1"),
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let (data, original_filename, content_type) =
        file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    if data.is_empty() {
        return Err(AppError::BadRequest("File is empty".to_string()));
    }

    if data.len() > MAX_RESOURCE_FILE_SIZE {
        return Err(AppError::PayloadTooLarge(format!(
            "File too large. Maximum size is {} bytes ({} MB)",
            MAX_RESOURCE_FILE_SIZE,
            MAX_RESOURCE_FILE_SIZE / 1024 / 1024
        )));
    }

    if !is_mime_type_allowed(&content_type) {
        return Err(AppError::BadRequest(format!(
            "File type '{}' is not allowed. Allowed types: {}",
            content_type,
            ALLOWED_MIME_TYPES.join(", ")
        )));
    }

    Ok(ResourceUpload {
        data,
        title: title.unwrap_or_else(|| original_filename.clone()),
        original_filename,
        content_type,
        description,
        folder_path,
        is_published,
    })
}

/// Body-limit rejections keep their 413, everything else is a bad request
fn multipart_error(context: &str, e: MultipartError) -> AppError {
    debug!("{}: {}", context, e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!(
            "Upload exceeds the maximum size of {} MB",
            MAX_RESOURCE_FILE_SIZE / 1024 / 1024
        ))
    } else {
        AppError::BadRequest(format!("{}: {}", context, e))
    }
}

/// Update a resource (content managers)
///
/// `null` clears `description` or `folder_path`. `url` is only accepted for link resources.
#[utoipa::path(
    put,
    path = "/api/admin/resources/{id}",
    params(
        ("id" = Uuid, Path, description = "Resource ID")
    ),
    request_body = UpdateResourceDto,
    responses(
        (status = 200, description = "Resource updated successfully", body = ApiResponse<ResourceResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - content manager only"),
        (status = 404, description = "Resource not found")
    ),
    tag = "resources",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_resource(
    RequireContentManager(_user): RequireContentManager,
    State(service): State<Arc<ResourceService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateResourceDto>,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let resource = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(Some(resource), None, None)))
}

/// Publish or unpublish a resource (content managers)
#[utoipa::path(
    patch,
    path = "/api/admin/resources/{id}/publish",
    params(
        ("id" = Uuid, Path, description = "Resource ID")
    ),
    request_body = SetPublishedDto,
    responses(
        (status = 200, description = "Publish state updated", body = ApiResponse<ResourceResponseDto>),
        (status = 403, description = "Forbidden - content manager only"),
        (status = 404, description = "Resource not found")
    ),
    tag = "resources",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_resource_published(
    RequireContentManager(_user): RequireContentManager,
    State(service): State<Arc<ResourceService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<SetPublishedDto>,
) -> Result<Json<ApiResponse<ResourceResponseDto>>> {
    let resource = service.set_published(id, dto.is_published).await?;
    Ok(Json(ApiResponse::success(Some(resource), None, None)))
}

/// Delete a resource (content managers)
#[utoipa::path(
    delete,
    path = "/api/admin/resources/{id}",
    params(
        ("id" = Uuid, Path, description = "Resource ID")
    ),
    responses(
        (status = 200, description = "Resource deleted successfully", body = ApiResponse<DeleteResourceResponseDto>),
        (status = 403, description = "Forbidden - content manager only"),
        (status = 404, description = "Resource not found")
    ),
    tag = "resources",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_resource(
    RequireContentManager(_user): RequireContentManager,
    State(service): State<Arc<ResourceService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeleteResourceResponseDto>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(
        Some(DeleteResourceResponseDto { deleted: true }),
        Some("Resource deleted successfully".to_string()),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::DefaultBodyLimit, routing::post, Router};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    async fn echo_upload(multipart: Multipart) -> Result<Json<Value>> {
        let upload = read_upload(multipart).await?;
        Ok(Json(json!({
            "title": upload.title,
            "original_filename": upload.original_filename,
            "content_type": upload.content_type,
            "folder_path": upload.folder_path,
            "is_published": upload.is_published,
            "valid": upload.validate().is_ok(),
        })))
    }

    fn upload_server(body_limit: usize) -> TestServer {
        let app = Router::new()
            .route("/upload", post(echo_upload))
            .layer(DefaultBodyLimit::max(body_limit));
        TestServer::new(app).unwrap()
    }

    fn pdf_part(file_name: &str) -> Part {
        Part::bytes(b"%PDF-1.7 sample".to_vec())
            .file_name(file_name)
            .mime_type("application/pdf")
    }

    #[tokio::test]
    async fn test_title_defaults_to_file_name() {
        let server = upload_server(1024 * 1024);
        let form = MultipartForm::new()
            .add_text("folder_path", " guides ")
            .add_text("is_published", "on")
            .add_part("file", pdf_part("syllabus.pdf"));

        let response = server.post("/upload").multipart(form).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["title"], "syllabus.pdf");
        assert_eq!(body["folder_path"], "guides");
        assert_eq!(body["is_published"], true);
        assert_eq!(body["valid"], true);
    }

    #[tokio::test]
    async fn test_long_file_name_is_stored_shortened() {
        let server = upload_server(1024 * 1024);
        let file_name = format!("{}.pdf", "x".repeat(300));
        let form = MultipartForm::new()
            .add_text("title", "Course outline")
            .add_part("file", pdf_part(&file_name));

        let response = server.post("/upload").multipart(form).await;
        response.assert_status_ok();
        let body: Value = response.json();
        let stored = body["original_filename"].as_str().unwrap();
        assert_eq!(stored.chars().count(), 255);
        assert!(stored.ends_with(".pdf"));
        assert_eq!(body["title"], "Course outline");
        assert_eq!(body["valid"], true);

        // Without a title the shortened name still makes a valid title
        let form = MultipartForm::new().add_part("file", pdf_part(&file_name));
        let body: Value = server.post("/upload").multipart(form).await.json();
        assert_eq!(body["valid"], true);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_payload_too_large() {
        let server = upload_server(1024);
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(vec![b'a'; 8 * 1024])
                .file_name("notes.txt")
                .mime_type("text/plain"),
        );

        let response = server.post("/upload").multipart(form).await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }
}
