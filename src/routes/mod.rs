/**
 * Routes Module
 * API route handlers
 */

pub mod auth;
pub mod collections;
pub mod engagement;
pub mod health;
pub mod upload;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::content::EntityKind;
use crate::error::StoreError;

/// Error body shared by every route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(status: StatusCode, error: impl Into<String>) -> ApiError {
        (status, Json(Self::new(error)))
    }
}

/// Map a store failure to a response; internal details are only logged.
pub fn store_error(kind: EntityKind, action: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => {
            ErrorResponse::status(StatusCode::NOT_FOUND, format!("{} not found", kind.label()))
        }
        StoreError::Invalid(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid payload").with_message(e.to_string())),
        ),
        StoreError::Unavailable => {
            ErrorResponse::status(StatusCode::SERVICE_UNAVAILABLE, "Database not configured")
        }
        other => {
            tracing::error!(entity = %kind, error = %other, "Failed to {}", action);
            ErrorResponse::status(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {action}"),
            )
        }
    }
}
