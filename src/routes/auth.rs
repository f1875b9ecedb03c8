/**
 * Session Check
 * Admin routes accept a bearer token issued by the hosted auth service
 */
use axum::{
    http::{HeaderMap, StatusCode},
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::routes::ErrorResponse;

/// HS256 secret shared with the auth service. Without one every admin
/// request is refused.
#[derive(Clone, Default)]
pub struct AuthConfig {
    secret: Option<Arc<str>>,
}

impl AuthConfig {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.trim().is_empty()).map(Arc::from),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// JWT claims of an auth-service session
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Verify and decode a session token
pub fn verify_access_token(
    token: &str,
    secret: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Gate for admin routes.
pub fn require_admin(
    auth: &AuthConfig,
    headers: &HeaderMap,
) -> Result<Claims, (StatusCode, Json<ErrorResponse>)> {
    let Some(secret) = auth.secret.as_deref() else {
        tracing::warn!("Admin request refused: AUTH_JWT_SECRET is not configured");
        return Err(ErrorResponse::status(
            StatusCode::SERVICE_UNAVAILABLE,
            "Authentication is not configured",
        ));
    };

    let Some(token) = extract_bearer_token(headers) else {
        return Err(ErrorResponse::status(
            StatusCode::UNAUTHORIZED,
            "Authorization required",
        ));
    };

    verify_access_token(token, secret).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        ErrorResponse::status(StatusCode::UNAUTHORIZED, "Invalid or expired token")
    })
}
