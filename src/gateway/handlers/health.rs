//! Health check handler

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use super::super::types::{ApiResult, ok};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
    pub version: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health_check() -> ApiResult<HealthResponse> {
    ok(
        "ok",
        HealthResponse {
            timestamp_ms: Utc::now().timestamp_millis() as u64,
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )
}
