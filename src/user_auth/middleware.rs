use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::core_types::UserId;
use crate::gateway::{state::AppState, types::ApiError};

use super::service::UserAuthService;

/// Authenticated caller, injected into request extensions by
/// [`jwt_auth_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("invalid token format"))?;

    let claims = state
        .auth
        .verify_token(token)
        .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;
    let user_id = UserAuthService::claims_user_id(&claims)
        .map_err(|_| ApiError::unauthorized("invalid token subject"))?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}
