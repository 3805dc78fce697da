use axum::{Json, extract::State};
use std::sync::Arc;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiResult, check_payload, created, ok};
use crate::registry::MemberProfile;

use super::service::{AuthResponse, LoginRequest, RegisterRequest};

/// Register a new user
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = MemberProfile),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<MemberProfile> {
    check_payload(&req)?;
    let member = state.auth.register(req)?;
    created("registration successful", member.profile())
}

/// Login and obtain a JWT
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    check_payload(&req)?;
    match state.auth.login(req) {
        Ok(resp) => ok("login successful", resp),
        Err(e) => {
            tracing::warn!(error = %e, "login rejected");
            Err(ApiError::unauthorized("invalid email or password"))
        }
    }
}
