use axum::{extract::State, response::Html};
use minijinja::context;
use std::sync::Arc;

use crate::core::error::Result;
use crate::features::resources::services::ResourceService;
use crate::shared::views::render_view;

/// Published resources grouped by folder
pub async fn resources_page(State(service): State<Arc<ResourceService>>) -> Result<Html<String>> {
    let listing = service.published_by_folder().await?;
    let html = render_view(
        "resources/index.html",
        context! { groups => listing.groups, truncated => listing.truncated },
    )?;
    Ok(Html(html))
}

#[cfg(test)]
mod tests {
    use crate::features::resources::dtos::{ResourceFolderGroup, ResourceResponseDto};
    use crate::features::resources::models::ResourceType;
    use crate::shared::views::render_view;
    use chrono::Utc;
    use minijinja::context;
    use uuid::Uuid;

    #[test]
    fn test_resource_list_renders_groups() {
        let resource = ResourceResponseDto {
            id: Uuid::now_v7(),
            title: "Fractions <intro>".to_string(),
            description: Some("Worksheet".to_string()),
            url: Some("https://example.com/fractions".to_string()),
            resource_type: ResourceType::Url,
            folder_path: Some("maths".to_string()),
            is_published: true,
            created_at: Utc::now(),
            file: None,
        };
        let id = resource.id;
        let groups = ResourceFolderGroup::group(vec![resource]);

        let html = render_view("resources/index.html", context! { groups => groups }).unwrap();
        assert!(html.contains(r#"<main class="container mx-auto px-4 py-8">"#));
        assert!(html.contains("maths"));
        assert!(html.contains(&format!("/api/resources/{}/download", id)));
        assert!(html.contains("Fractions &lt;intro&gt;"));
    }

    #[test]
    fn test_empty_resource_list() {
        let groups: Vec<ResourceFolderGroup> = Vec::new();
        let html = render_view("resources/index.html", context! { groups => groups }).unwrap();
        assert!(html.contains("No resources have been published yet."));
        assert!(!html.contains("Only the first"));
    }

    #[test]
    fn test_truncated_list_shows_notice() {
        let groups: Vec<ResourceFolderGroup> = Vec::new();
        let html = render_view(
            "resources/index.html",
            context! { groups => groups, truncated => true },
        )
        .unwrap();
        assert!(html.contains("Only the first resources are listed here."));
    }
}
