/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Instant;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// What the readiness check can see.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    pub pool: Option<PgPool>,
    pub assets_configured: bool,
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    pub checks: ReadyChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ready checks summary
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyChecks {
    pub database: ServiceCheck,
    pub assets: String,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_ping))
        .route("/health/ready", get(health_ready))
        .with_state(state)
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

async fn database_check(pool: Option<&PgPool>) -> ServiceCheck {
    let Some(pool) = pool else {
        return ServiceCheck {
            status: "not configured".to_string(),
            response_time: None,
            error: None,
        };
    };

    match crate::db::health_check(pool).await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => ServiceCheck {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some(e.to_string()),
        },
    }
}

/// GET /health/ready - Readiness check
///
/// Running without a database is a supported mode; a configured database
/// that does not answer is not.
pub async fn health_ready(State(state): State<HealthState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let database = database_check(state.pool.as_ref()).await;
    let is_ready = database.status != "unhealthy";

    let response = ReadyResponse {
        status: if is_ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: Some(uptime),
        reason: (!is_ready).then(|| "Database is not healthy".to_string()),
        checks: ReadyChecks {
            database,
            assets: if state.assets_configured {
                "configured"
            } else {
                "not configured"
            }
            .to_string(),
        },
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
