//! Member profile and KYC handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::core_types::UserId;
use crate::registry::{KycSubmission, Member, MemberProfile};
use crate::user_auth::AuthUser;

use super::super::state::AppState;
use super::super::types::{ApiResult, ok};
use super::staff_gate;

#[derive(Debug, Deserialize, ToSchema)]
pub struct KycReviewBody {
    pub approved: bool,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Own member record, including KYC state and reliability history
///
/// GET /api/v1/members/me
#[utoipa::path(
    get,
    path = "/api/v1/members/me",
    responses(
        (status = 200, description = "Member record"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_jwt" = [])),
    tag = "Members"
)]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Member> {
    let member = state.registry.get(user)?;
    ok("member record", member)
}

/// Public profile of a member
///
/// GET /api/v1/members/{id}
#[utoipa::path(
    get,
    path = "/api/v1/members/{id}",
    params(("id" = u64, Path, description = "Member id")),
    responses(
        (status = 200, description = "Member profile", body = MemberProfile),
        (status = 404, description = "Unknown member")
    ),
    security(("bearer_jwt" = [])),
    tag = "Members"
)]
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> ApiResult<MemberProfile> {
    let member = state.registry.get(id)?;
    ok("member profile", member.profile())
}

/// Submit KYC documents for review
///
/// POST /api/v1/members/kyc
#[utoipa::path(
    post,
    path = "/api/v1/members/kyc",
    request_body = KycSubmission,
    responses(
        (status = 200, description = "Documents submitted"),
        (status = 409, description = "KYC already verified")
    ),
    security(("bearer_jwt" = [])),
    tag = "Members"
)]
pub async fn submit_kyc(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(submission): Json<KycSubmission>,
) -> ApiResult<Member> {
    let member = state.registry.submit_kyc(user, submission)?;
    ok("KYC documents submitted", member)
}

/// Submissions awaiting review (operators only)
///
/// GET /api/v1/members/kyc/pending
#[utoipa::path(
    get,
    path = "/api/v1/members/kyc/pending",
    responses(
        (status = 200, description = "Pending submissions"),
        (status = 403, description = "Operator role required")
    ),
    security(("bearer_jwt" = [])),
    tag = "Members"
)]
pub async fn pending_kyc(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Vec<Member>> {
    staff_gate(&state, user)?;
    ok("pending KYC submissions", state.registry.pending_kyc())
}

/// Approve or reject a KYC submission (operators only)
///
/// POST /api/v1/members/{id}/kyc/review
#[utoipa::path(
    post,
    path = "/api/v1/members/{id}/kyc/review",
    params(("id" = u64, Path, description = "Member id")),
    request_body = KycReviewBody,
    responses(
        (status = 200, description = "Review recorded"),
        (status = 403, description = "Operator role required"),
        (status = 409, description = "No pending submission")
    ),
    security(("bearer_jwt" = [])),
    tag = "Members"
)]
pub async fn review_kyc(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(reviewer)): Extension<AuthUser>,
    Path(id): Path<UserId>,
    Json(body): Json<KycReviewBody>,
) -> ApiResult<Member> {
    staff_gate(&state, reviewer)?;
    let member = state
        .registry
        .review_kyc(id, reviewer, body.approved, body.rejection_reason)?;
    ok("KYC review recorded", member)
}
