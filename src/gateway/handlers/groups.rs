//! Group lifecycle handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::{GroupId, UserId};
use crate::group::{
    ContributionSettings, CreateGroupRequest, Frequency, Group, GroupRules, SettingsPatch,
};
use crate::ledger::{TransactionFilter, TransactionStats};
use crate::round::Round;
use crate::user_auth::AuthUser;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, check_payload, created, ok};
use super::{group_admin_gate, parse_money};

/// Contribution settings as sent by clients: decimal amount string, parsed
/// into minor units at the boundary.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ContributionSettingsBody {
    #[schema(example = "100.00")]
    pub amount: String,
    pub frequency: Frequency,
    #[schema(example = 5)]
    pub payment_deadline_day: u8,
}

impl ContributionSettingsBody {
    fn into_settings(self) -> Result<ContributionSettings, ApiError> {
        Ok(ContributionSettings {
            amount: parse_money(&self.amount)?,
            frequency: self.frequency,
            payment_deadline_day: self.payment_deadline_day,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGroupBody {
    #[validate(length(min = 3, max = 64, message = "must be 3 to 64 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub contribution_settings: ContributionSettingsBody,
    #[serde(default)]
    pub rules: Option<GroupRules>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateGroupBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contribution_settings: Option<ContributionSettingsBody>,
    #[serde(default)]
    pub rules: Option<GroupRules>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberBody {
    pub user_id: UserId,
}

/// Create a savings group
///
/// POST /api/v1/groups
#[utoipa::path(
    post,
    path = "/api/v1/groups",
    request_body = CreateGroupBody,
    responses(
        (status = 201, description = "Group created in pending status"),
        (status = 400, description = "Invalid settings"),
        (status = 403, description = "Creator KYC not verified")
    ),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<CreateGroupBody>,
) -> ApiResult<Group> {
    check_payload(&body)?;
    let req = CreateGroupRequest {
        name: body.name,
        description: body.description,
        contribution_settings: body.contribution_settings.into_settings()?,
        rules: body.rules,
    };
    let group = state.groups.create_group(user, req).await?;
    created("group created", group)
}

/// Groups the caller belongs to
///
/// GET /api/v1/groups
#[utoipa::path(
    get,
    path = "/api/v1/groups",
    responses((status = 200, description = "Groups of the caller")),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn my_groups(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Vec<Group>> {
    ok("groups", state.groups.user_groups(user))
}

/// Group details (members only)
///
/// GET /api/v1/groups/{id}
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group details"),
        (status = 403, description = "Not a member"),
        (status = 404, description = "Unknown group")
    ),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Group> {
    ok("group details", state.groups.group_details(id, user)?)
}

/// Update settings while the group is pending (admin only)
///
/// PATCH /api/v1/groups/{id}
#[utoipa::path(
    patch,
    path = "/api/v1/groups/{id}",
    params(("id" = String, Path, description = "Group id")),
    request_body = UpdateGroupBody,
    responses(
        (status = 200, description = "Settings updated"),
        (status = 409, description = "Group is no longer pending")
    ),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
    Json(body): Json<UpdateGroupBody>,
) -> ApiResult<Group> {
    let patch = SettingsPatch {
        description: body.description,
        contribution_settings: body
            .contribution_settings
            .map(|s| s.into_settings())
            .transpose()?,
        rules: body.rules,
    };
    ok("settings updated", state.groups.update_settings(id, user, patch).await?)
}

/// Add a member (admin only)
///
/// POST /api/v1/groups/{id}/members
#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/members",
    params(("id" = String, Path, description = "Group id")),
    request_body = AddMemberBody,
    responses(
        (status = 200, description = "Member added"),
        (status = 403, description = "Requester is not an admin or target unverified"),
        (status = 409, description = "Already a member"),
        (status = 422, description = "Score or capacity rule violated")
    ),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
    Json(body): Json<AddMemberBody>,
) -> ApiResult<Group> {
    ok(
        "member added",
        state.groups.add_member(id, body.user_id, user).await?,
    )
}

/// Remove (soft-leave) a member
///
/// DELETE /api/v1/groups/{id}/members/{user_id}
#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}/members/{user_id}",
    params(
        ("id" = String, Path, description = "Group id"),
        ("user_id" = u64, Path, description = "Member to remove")
    ),
    responses(
        (status = 200, description = "Member marked as left"),
        (status = 403, description = "Not authorized or target is the creator")
    ),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path((id, target)): Path<(GroupId, UserId)>,
) -> ApiResult<Group> {
    ok(
        "member removed",
        state.groups.remove_member(id, target, user).await?,
    )
}

/// Start the rotation (admin only)
///
/// POST /api/v1/groups/{id}/start
#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/start",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group started, round 1 open"),
        (status = 409, description = "Not pending or fewer than 2 active members")
    ),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn start_group(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Group> {
    ok("group started", state.groups.start_group(id, user).await?)
}

/// End the group (admin only, idempotent)
///
/// POST /api/v1/groups/{id}/end
#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/end",
    params(("id" = String, Path, description = "Group id")),
    responses((status = 200, description = "Group completed")),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn end_group(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Group> {
    ok("group ended", state.groups.end_group(id, user).await?)
}

/// Suspend an active group (admin only)
///
/// POST /api/v1/groups/{id}/suspend
#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/suspend",
    params(("id" = String, Path, description = "Group id")),
    responses((status = 200, description = "Group suspended")),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn suspend_group(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Group> {
    ok("group suspended", state.groups.suspend_group(id, user).await?)
}

/// Resume a suspended group (admin only)
///
/// POST /api/v1/groups/{id}/resume
#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/resume",
    params(("id" = String, Path, description = "Group id")),
    responses((status = 200, description = "Group resumed")),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn resume_group(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Group> {
    ok("group resumed", state.groups.resume_group(id, user).await?)
}

/// Rounds of a group, newest first
///
/// GET /api/v1/groups/{id}/rounds
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/rounds",
    params(("id" = String, Path, description = "Group id")),
    responses((status = 200, description = "Rounds of the group")),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn group_rounds(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Vec<Round>> {
    state.groups.group_details(id, user)?;
    ok("rounds", state.engine.group_rounds(id)?)
}

/// The currently active round of a group
///
/// GET /api/v1/groups/{id}/rounds/current
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/rounds/current",
    params(("id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Current round"),
        (status = 404, description = "No active round")
    ),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn current_round(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Round> {
    state.groups.group_details(id, user)?;
    match state.engine.current_round(id)? {
        Some(round) => ok("current round", round),
        None => Err(crate::error::CoreError::not_found("active round for group").into()),
    }
}

/// Transactions of a group, filterable by type and status
///
/// GET /api/v1/groups/{id}/transactions
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/transactions",
    params(
        ("id" = String, Path, description = "Group id"),
        ("txn_type" = Option<String>, Query, description = "contribution | distribution | penalty"),
        ("status" = Option<String>, Query, description = "pending | confirmed | failed | cancelled")
    ),
    responses((status = 200, description = "Transactions of the group")),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn group_transactions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
    Query(filter): Query<TransactionFilter>,
) -> ApiResult<Vec<crate::ledger::Transaction>> {
    state.groups.group_details(id, user)?;
    ok("transactions", state.ledger.group_transactions(id, filter)?)
}

/// Aggregate transaction statistics for a group
///
/// GET /api/v1/groups/{id}/transactions/stats
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/transactions/stats",
    params(("id" = String, Path, description = "Group id")),
    responses((status = 200, description = "Transaction statistics", body = TransactionStats)),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn group_transaction_stats(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<TransactionStats> {
    state.groups.group_details(id, user)?;
    ok("transaction statistics", state.ledger.transaction_stats(id)?)
}

/// Recompute group totals from the round store (admin only)
///
/// POST /api/v1/groups/{id}/reconcile-totals
#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/reconcile-totals",
    params(("id" = String, Path, description = "Group id")),
    responses((status = 200, description = "Totals recomputed from rounds")),
    security(("bearer_jwt" = [])),
    tag = "Groups"
)]
pub async fn reconcile_group_totals(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<GroupId>,
) -> ApiResult<Group> {
    group_admin_gate(&state, id, user)?;
    ok("totals recomputed", state.engine.recompute_group_totals(id)?)
}
