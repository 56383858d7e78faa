use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::resources::{
    dtos as resources_dtos, handlers as resources_handlers, models as resources_models,
};
use crate::features::surveys::{
    dtos as surveys_dtos, handlers as surveys_handlers, models as surveys_models,
};
use crate::shared::types::{ApiResponse, Meta, SortDirection};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Resources (public)
        resources_handlers::list_resources,
        resources_handlers::list_folders,
        resources_handlers::get_resource,
        resources_handlers::download_resource,
        // Resources (content managers)
        resources_handlers::admin_list_resources,
        resources_handlers::admin_get_resource,
        resources_handlers::create_link_resource,
        resources_handlers::upload_resource,
        resources_handlers::update_resource,
        resources_handlers::set_resource_published,
        resources_handlers::delete_resource,
        // Surveys
        surveys_handlers::create_survey_response,
        surveys_handlers::list_survey_responses,
        surveys_handlers::survey_summary,
    ),
    components(
        schemas(
            Meta,
            SortDirection,
            // Resources
            resources_models::ResourceType,
            resources_dtos::ResourceResponseDto,
            resources_dtos::ResourceFileDto,
            resources_dtos::FolderSummaryDto,
            resources_dtos::CreateLinkResourceDto,
            resources_dtos::UpdateResourceDto,
            resources_dtos::SetPublishedDto,
            resources_dtos::UploadResourceDto,
            resources_dtos::DeleteResourceResponseDto,
            ApiResponse<resources_dtos::ResourceResponseDto>,
            ApiResponse<Vec<resources_dtos::ResourceResponseDto>>,
            ApiResponse<Vec<resources_dtos::FolderSummaryDto>>,
            ApiResponse<resources_dtos::DeleteResourceResponseDto>,
            // Surveys
            surveys_models::SurveyRespondentRole,
            surveys_dtos::CreateSurveyResponseDto,
            surveys_dtos::SurveyResponseDto,
            surveys_dtos::SurveySummaryDto,
            surveys_dtos::RoleCountDto,
            ApiResponse<surveys_dtos::SurveyResponseDto>,
            ApiResponse<Vec<surveys_dtos::SurveyResponseDto>>,
            ApiResponse<surveys_dtos::SurveySummaryDto>,
        )
    ),
    tags(
        (name = "resources", description = "Resource library: uploaded files and external links"),
        (name = "surveys", description = "Survey submissions and results"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Resource Portal API",
        version = "0.1.0",
        description = "API documentation for the Resource Portal",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
