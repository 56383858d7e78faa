use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::features::resources::dtos::MAX_RESOURCE_FILE_SIZE;
use crate::features::resources::handlers;
use crate::features::resources::services::ResourceService;

/// Public resource API, published resources only
pub fn public_routes(service: Arc<ResourceService>) -> Router {
    Router::new()
        .route("/api/resources", get(handlers::list_resources))
        .route("/api/resources/folders", get(handlers::list_folders))
        .route("/api/resources/{id}", get(handlers::get_resource))
        .route(
            "/api/resources/{id}/download",
            get(handlers::download_resource),
        )
        .with_state(service)
}

/// Resource management (require auth middleware to be applied by caller)
pub fn admin_routes(service: Arc<ResourceService>) -> Router {
    Router::new()
        .route(
            "/api/admin/resources",
            get(handlers::admin_list_resources).post(handlers::create_link_resource),
        )
        .route(
            "/api/admin/resources/upload",
            // Allow body size up to MAX_RESOURCE_FILE_SIZE + buffer for multipart overhead
            post(handlers::upload_resource)
                .layer(DefaultBodyLimit::max(MAX_RESOURCE_FILE_SIZE + 1024 * 1024)),
        )
        .route(
            "/api/admin/resources/{id}",
            get(handlers::admin_get_resource)
                .put(handlers::update_resource)
                .delete(handlers::delete_resource),
        )
        .route(
            "/api/admin/resources/{id}/publish",
            patch(handlers::set_resource_published),
        )
        .with_state(service)
}

/// HTML resource listing
pub fn page_routes(service: Arc<ResourceService>) -> Router {
    Router::new()
        .route("/resources", get(handlers::resources_page))
        .with_state(service)
}
