//! Round engine handlers.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{Path, State},
};

use crate::core_types::RoundId;
use crate::round::{Participant, Round, RoundStats};
use crate::user_auth::AuthUser;

use super::super::state::AppState;
use super::super::types::{ApiResult, ok};
use super::group_admin_gate;

/// Round details (group members only)
///
/// GET /api/v1/rounds/{id}
#[utoipa::path(
    get,
    path = "/api/v1/rounds/{id}",
    params(("id" = String, Path, description = "Round id")),
    responses(
        (status = 200, description = "Round details"),
        (status = 404, description = "Unknown round")
    ),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn get_round(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<RoundId>,
) -> ApiResult<Round> {
    let round = state.engine.round(id)?;
    state.groups.group_details(round.group, user)?;
    ok("round details", round)
}

/// Participants past the deadline who still owe
///
/// GET /api/v1/rounds/{id}/late
#[utoipa::path(
    get,
    path = "/api/v1/rounds/{id}/late",
    params(("id" = String, Path, description = "Round id")),
    responses((status = 200, description = "Late participants")),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn late_participants(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<RoundId>,
) -> ApiResult<Vec<Participant>> {
    let round = state.engine.round(id)?;
    state.groups.group_details(round.group, user)?;
    ok("late participants", state.engine.late_participants(id)?)
}

/// Collection statistics for a round
///
/// GET /api/v1/rounds/{id}/stats
#[utoipa::path(
    get,
    path = "/api/v1/rounds/{id}/stats",
    params(("id" = String, Path, description = "Round id")),
    responses((status = 200, description = "Round statistics", body = RoundStats)),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn round_stats(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<RoundId>,
) -> ApiResult<RoundStats> {
    let round = state.engine.round(id)?;
    state.groups.group_details(round.group, user)?;
    ok("round statistics", state.engine.round_stats(id)?)
}

/// Close the round and open the next one, or complete the group after the
/// final round (admin only)
///
/// POST /api/v1/rounds/{id}/advance
#[utoipa::path(
    post,
    path = "/api/v1/rounds/{id}/advance",
    params(("id" = String, Path, description = "Round id")),
    responses(
        (status = 200, description = "Round closed; next round opened or group completed"),
        (status = 409, description = "Round already advanced or cancelled")
    ),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn advance_round(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<RoundId>,
) -> ApiResult<Round> {
    let round = state.engine.round(id)?;
    group_admin_gate(&state, round.group, user)?;
    ok(
        "round advanced",
        state.engine.complete_round_and_create_next(id).await?,
    )
}

/// Cancel an active round (admin only)
///
/// POST /api/v1/rounds/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/v1/rounds/{id}/cancel",
    params(("id" = String, Path, description = "Round id")),
    responses(
        (status = 200, description = "Round cancelled"),
        (status = 409, description = "Round is not active")
    ),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn cancel_round(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<RoundId>,
) -> ApiResult<Round> {
    let round = state.engine.round(id)?;
    group_admin_gate(&state, round.group, user)?;
    ok("round cancelled", state.engine.cancel_round(id).await?)
}

/// Re-apply confirmed contributions whose round payment never landed
/// (admin only)
///
/// POST /api/v1/rounds/{id}/reconcile
#[utoipa::path(
    post,
    path = "/api/v1/rounds/{id}/reconcile",
    params(("id" = String, Path, description = "Round id")),
    responses((status = 200, description = "Number of contributions re-applied")),
    security(("bearer_jwt" = [])),
    tag = "Rounds"
)]
pub async fn reconcile_round(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<RoundId>,
) -> ApiResult<u32> {
    let round = state.engine.round(id)?;
    group_admin_gate(&state, round.group, user)?;
    ok("reconciliation done", state.settlement.reconcile_round(id).await?)
}
