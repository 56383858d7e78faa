use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use minijinja::context;
use serde::Deserialize;
use std::sync::Arc;

use crate::core::error::Result;
use crate::features::surveys::dtos::{RoleOption, SurveyFormInput};
use crate::features::surveys::services::SurveyService;
use crate::shared::views::{render_view, ViewError};

#[derive(Debug, Default, Deserialize)]
pub struct SurveyPageQuery {
    pub submitted: Option<String>,
}

fn render_survey_page(
    form: &SurveyFormInput,
    errors: &[String],
    submitted: bool,
) -> std::result::Result<String, ViewError> {
    render_view(
        "survey/page.html",
        context! {
            form => form,
            errors => errors,
            roles => RoleOption::all(),
            submitted => submitted,
        },
    )
}

/// The survey page: one survey form inside the site layout
pub async fn survey_page(Query(query): Query<SurveyPageQuery>) -> Result<Html<String>> {
    let submitted = query.submitted.as_deref() == Some("true");
    let html = render_survey_page(&SurveyFormInput::default(), &[], submitted)?;
    Ok(Html(html))
}

/// Handle the survey form post
///
/// Invalid input is shown again with 422; a stored response redirects to the thank-you view.
pub async fn submit_survey_form(
    State(service): State<Arc<SurveyService>>,
    Form(input): Form<SurveyFormInput>,
) -> Result<Response> {
    let dto = match input.to_dto() {
        Ok(dto) => dto,
        Err(errors) => {
            tracing::debug!("Survey form rejected with {} errors", errors.len());
            let html = render_survey_page(&input, &errors, false)?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response());
        }
    };

    service.create(dto).await?;
    Ok(Redirect::to("/survey?submitted=true").into_response())
}
