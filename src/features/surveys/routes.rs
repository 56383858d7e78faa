use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::surveys::handlers;
use crate::features::surveys::services::SurveyService;

/// Public survey submission API
pub fn public_routes(service: Arc<SurveyService>) -> Router {
    Router::new()
        .route("/api/surveys", post(handlers::create_survey_response))
        .with_state(service)
}

/// Survey results (require auth middleware to be applied by caller)
pub fn admin_routes(service: Arc<SurveyService>) -> Router {
    Router::new()
        .route("/api/admin/surveys", get(handlers::list_survey_responses))
        .route("/api/admin/surveys/summary", get(handlers::survey_summary))
        .with_state(service)
}

/// The survey page and its form post
pub fn page_routes(service: Arc<SurveyService>) -> Router {
    Router::new()
        .route(
            "/survey",
            get(handlers::survey_page).post(handlers::submit_survey_form),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::surveys::dtos::SurveyFormInput;
    use crate::shared::test_helpers::{create_viewer_user, lazy_pool, with_user_auth};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn service() -> Arc<SurveyService> {
        Arc::new(SurveyService::new(lazy_pool()))
    }

    #[tokio::test]
    async fn test_survey_page_renders_single_form_in_container() {
        let server = TestServer::new(page_routes(service())).unwrap();

        let response = server.get("/survey").await;
        response.assert_status_ok();
        let html = response.text();

        assert_eq!(html.matches("<form").count(), 1);
        assert!(html.contains(r#"id="survey-form""#));

        let main = html.find(r#"<main class="container mx-auto px-4 py-8">"#).unwrap();
        let container = html.find(r#"<div class="max-w-3xl mx-auto""#).unwrap();
        let form = html.find("<form").unwrap();
        assert!(main < container && container < form);
        assert_eq!(html.matches("<main").count(), 1);

        assert!(!html.contains("Thank you!"));
    }

    #[tokio::test]
    async fn test_survey_page_shows_thank_you_after_submit() {
        let server = TestServer::new(page_routes(service())).unwrap();

        let response = server
            .get("/survey")
            .add_query_param("submitted", "true")
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Thank you!"));
    }

    #[tokio::test]
    async fn test_invalid_form_is_shown_again_with_values() {
        let server = TestServer::new(page_routes(service())).unwrap();
        let input = SurveyFormInput {
            respondent_name: Some("Rosa Parks".to_string()),
            role: Some("parent".to_string()),
            satisfaction: Some("4".to_string()),
            feedback: Some("Keep the <b>worksheets</b> coming".to_string()),
            wants_follow_up: Some("on".to_string()),
            ..Default::default()
        };

        let response = server.post("/survey").form(&input).await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let html = response.text();
        assert!(html.contains("An email address is required to receive a follow-up"));
        assert!(html.contains(r#"value="Rosa Parks""#));
        assert!(html.contains("Keep the &lt;b&gt;worksheets&lt;/b&gt; coming"));
        assert!(html.contains(r#"<option value="parent" selected>"#));
        assert!(html.contains(r#"value="4" checked"#));
        assert_eq!(html.matches("<form").count(), 1);
    }

    #[tokio::test]
    async fn test_json_submission_validates() {
        let server = TestServer::new(public_routes(service())).unwrap();

        let response = server
            .post("/api/surveys")
            .json(&json!({ "role": "student", "satisfaction": 6, "feedback": "ok" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);

        server
            .post("/api/surveys")
            .json(&json!({
                "role": "student",
                "satisfaction": 3,
                "feedback": "ok",
                "wants_follow_up": true
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/surveys")
            .json(&json!({ "role": "robot", "satisfaction": 3, "feedback": "ok" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_survey_routes_are_guarded() {
        let server = TestServer::new(admin_routes(service())).unwrap();
        server
            .get("/api/admin/surveys")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let app = with_user_auth(admin_routes(service()), create_viewer_user());
        let server = TestServer::new(app).unwrap();
        server
            .get("/api/admin/surveys/summary")
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
