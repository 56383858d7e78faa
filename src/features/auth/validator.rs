use super::model::{AuthenticatedUser, CustomClaims};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::jwks::JwksClient;

pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    claims_namespace: String,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,

    /// Present on some issuers to tell access tokens from ID tokens
    #[serde(default)]
    kind: Option<String>,

    /// Everything else, including the namespaced custom claims
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

impl JwtValidator {
    pub fn new(jwks_client: Arc<JwksClient>, config: &AuthConfig) -> Self {
        Self {
            jwks_client,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            claims_namespace: config.claims_namespace.clone(),
            leeway: config.jwt_leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        user_from_claims(token_data.claims, &self.claims_namespace)
    }
}

/// Turn validated claims into the request user
fn user_from_claims(claims: Claims, namespace: &str) -> Result<AuthenticatedUser, AppError> {
    if let Some(kind) = &claims.kind {
        if kind != "AccessToken" {
            return Err(AppError::Auth("Token is not an access token".to_string()));
        }
    }

    let custom = match claims.extra.get(namespace) {
        Some(value) => serde_json::from_value::<CustomClaims>(value.clone())
            .map_err(|e| AppError::Auth(format!("Malformed custom claims: {}", e)))?,
        None => CustomClaims::default(),
    };

    Ok(AuthenticatedUser {
        sub: claims.sub,
        roles: custom.roles,
    })
}
