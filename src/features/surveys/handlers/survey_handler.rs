use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireContentManager;
use crate::features::surveys::dtos::{
    CreateSurveyResponseDto, SurveyQueryParams, SurveyResponseDto, SurveySummaryDto,
};
use crate::features::surveys::services::SurveyService;
use crate::shared::types::{ApiResponse, Meta};

/// Submit a survey response (public)
#[utoipa::path(
    post,
    path = "/api/surveys",
    request_body = CreateSurveyResponseDto,
    responses(
        (status = 201, description = "Survey response recorded", body = ApiResponse<SurveyResponseDto>),
        (status = 400, description = "Validation error")
    ),
    tag = "surveys"
)]
pub async fn create_survey_response(
    State(service): State<Arc<SurveyService>>,
    AppJson(dto): AppJson<CreateSurveyResponseDto>,
) -> Result<(StatusCode, Json<ApiResponse<SurveyResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(response),
            Some("Thank you for your feedback".to_string()),
            None,
        )),
    ))
}

/// List survey responses (content managers)
#[utoipa::path(
    get,
    path = "/api/admin/surveys",
    params(SurveyQueryParams),
    responses(
        (status = 200, description = "Survey responses retrieved successfully", body = ApiResponse<Vec<SurveyResponseDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Forbidden - content manager only")
    ),
    tag = "surveys",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_survey_responses(
    RequireContentManager(_user): RequireContentManager,
    State(service): State<Arc<SurveyService>>,
    AppQuery(params): AppQuery<SurveyQueryParams>,
) -> Result<Json<ApiResponse<Vec<SurveyResponseDto>>>> {
    let (responses, total) = service.list(&params).await?;
    Ok(Json(ApiResponse::success(
        Some(responses),
        None,
        Some(Meta { total }),
    )))
}

/// Survey results at a glance (content managers)
#[utoipa::path(
    get,
    path = "/api/admin/surveys/summary",
    responses(
        (status = 200, description = "Survey summary", body = ApiResponse<SurveySummaryDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Forbidden - content manager only")
    ),
    tag = "surveys",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn survey_summary(
    RequireContentManager(_user): RequireContentManager,
    State(service): State<Arc<SurveyService>>,
) -> Result<Json<ApiResponse<SurveySummaryDto>>> {
    let summary = service.summary().await?;
    Ok(Json(ApiResponse::success(Some(summary), None, None)))
}
