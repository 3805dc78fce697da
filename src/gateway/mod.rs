//! HTTP boundary.
//!
//! Thin axum layer over the core services: unified envelope, JWT-gated
//! private routes, Swagger UI. All rules live in the services; handlers only
//! authenticate, parse, and map errors.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use crate::user_auth;

use openapi::ApiDoc;
use state::AppState;

/// Assemble the full router: public auth/health routes plus the JWT-gated
/// API surface, Swagger UI mounted at /docs.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .route("/api/v1/auth/register", post(user_auth::handlers::register))
        .route("/api/v1/auth/login", post(user_auth::handlers::login));

    let private = Router::new()
        .route("/api/v1/members/me", get(handlers::get_me))
        .route("/api/v1/members/kyc", post(handlers::submit_kyc))
        .route("/api/v1/members/kyc/pending", get(handlers::pending_kyc))
        .route("/api/v1/members/{id}", get(handlers::get_member))
        .route("/api/v1/members/{id}/kyc/review", post(handlers::review_kyc))
        .route(
            "/api/v1/groups",
            post(handlers::create_group).get(handlers::my_groups),
        )
        .route(
            "/api/v1/groups/{id}",
            get(handlers::get_group).patch(handlers::update_group),
        )
        .route("/api/v1/groups/{id}/members", post(handlers::add_member))
        .route(
            "/api/v1/groups/{id}/members/{user_id}",
            delete(handlers::remove_member),
        )
        .route("/api/v1/groups/{id}/start", post(handlers::start_group))
        .route("/api/v1/groups/{id}/end", post(handlers::end_group))
        .route("/api/v1/groups/{id}/suspend", post(handlers::suspend_group))
        .route("/api/v1/groups/{id}/resume", post(handlers::resume_group))
        .route("/api/v1/groups/{id}/rounds", get(handlers::group_rounds))
        .route(
            "/api/v1/groups/{id}/rounds/current",
            get(handlers::current_round),
        )
        .route(
            "/api/v1/groups/{id}/transactions",
            get(handlers::group_transactions),
        )
        .route(
            "/api/v1/groups/{id}/transactions/stats",
            get(handlers::group_transaction_stats),
        )
        .route(
            "/api/v1/groups/{id}/reconcile-totals",
            post(handlers::reconcile_group_totals),
        )
        .route("/api/v1/rounds/{id}", get(handlers::get_round))
        .route("/api/v1/rounds/{id}/late", get(handlers::late_participants))
        .route("/api/v1/rounds/{id}/stats", get(handlers::round_stats))
        .route("/api/v1/rounds/{id}/advance", post(handlers::advance_round))
        .route("/api/v1/rounds/{id}/cancel", post(handlers::cancel_round))
        .route(
            "/api/v1/rounds/{id}/reconcile",
            post(handlers::reconcile_round),
        )
        .route(
            "/api/v1/transactions",
            post(handlers::create_contribution),
        )
        .route("/api/v1/transactions/mine", get(handlers::my_transactions))
        .route("/api/v1/transactions/{id}", get(handlers::get_transaction))
        .route(
            "/api/v1/transactions/{id}/confirm",
            post(handlers::confirm_transaction),
        )
        .route(
            "/api/v1/transactions/{id}/settle",
            post(handlers::settle_transaction),
        )
        .route(
            "/api/v1/transactions/{id}/fail",
            post(handlers::fail_transaction),
        )
        .route(
            "/api/v1/transactions/{id}/dispute",
            post(handlers::create_dispute),
        )
        .route(
            "/api/v1/transactions/{id}/dispute/resolve",
            post(handlers::resolve_dispute),
        )
        .layer(from_fn_with_state(
            Arc::clone(&state),
            user_auth::jwt_auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(private)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(state: Arc<AppState>, config: &GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("gateway listening on {}", addr);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
