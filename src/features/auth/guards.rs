//! Role-based authorization guards.
//!
//! The auth middleware places an [`AuthenticatedUser`] in the request extensions;
//! guards read it and check roles. A missing user is a 401, a missing role a 403.

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use axum::{extract::FromRequestParts, http::request::Parts};

fn current_user(parts: &Parts) -> Result<&AuthenticatedUser, AppError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("User not authenticated".to_string()))
}

/// Guard for resource curation and survey results.
///
/// Allows users with "super_admin" or "content_manager" roles.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireContentManager(user): RequireContentManager) { ... }
/// ```
pub struct RequireContentManager(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireContentManager
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)?;

        if !user.can_manage_content() {
            return Err(AppError::Forbidden(
                "Content manager access required".to_string(),
            ));
        }

        Ok(RequireContentManager(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn guard_with(user: Option<AuthenticatedUser>) -> Result<RequireContentManager, AppError> {
        let mut request = Request::builder().uri("/").body(()).unwrap();
        if let Some(user) = user {
            request.extensions_mut().insert(user);
        }
        let (mut parts, _) = request.into_parts();
        RequireContentManager::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let err = guard_with(None).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_checked() {
        let viewer = AuthenticatedUser {
            sub: "u1".to_string(),
            roles: vec!["viewer".to_string()],
        };
        let err = guard_with(Some(viewer)).await.err().unwrap();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let manager = AuthenticatedUser {
            sub: "u2".to_string(),
            roles: vec!["content_manager".to_string()],
        };
        let RequireContentManager(user) = guard_with(Some(manager)).await.ok().unwrap();
        assert_eq!(user.sub, "u2");
    }
}
