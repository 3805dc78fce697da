//! Contribution ledger handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::{GroupId, RoundId, TxnId, UserId};
use crate::error::CoreError;
use crate::ledger::{ContributionRequest, PaymentMethod, Transaction, TxnMetadata};
use crate::round::Round;
use crate::user_auth::AuthUser;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, check_payload, created, ok};
use super::parse_money;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContributionBody {
    pub group: GroupId,
    pub round: RoundId,
    #[schema(example = "100.00")]
    pub amount: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub metadata: Option<TxnMetadata>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FailBody {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DisputeBody {
    #[validate(length(min = 10, message = "must be at least 10 characters"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResolveDisputeBody {
    pub accepted: bool,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub resolution: String,
}

/// The payer, or any admin of the transaction's group, may act on it.
fn payer_or_admin_gate(
    state: &AppState,
    txn: &Transaction,
    user: UserId,
) -> Result<(), ApiError> {
    if txn.payer == user {
        return Ok(());
    }
    let group = state.groups.group_details(txn.group, user)?;
    if !group.is_admin(user) {
        return Err(CoreError::permission_denied("not your transaction").into());
    }
    Ok(())
}

/// Record a pending contribution
///
/// POST /api/v1/transactions
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    request_body = ContributionBody,
    responses(
        (status = 201, description = "Contribution recorded as pending"),
        (status = 400, description = "Invalid amount or round/group mismatch"),
        (status = 404, description = "Payer is not a participant of the round")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn create_contribution(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<ContributionBody>,
) -> ApiResult<Transaction> {
    let req = ContributionRequest {
        group: body.group,
        round: body.round,
        amount: parse_money(&body.amount)?,
        payment_method: body.payment_method,
        metadata: body.metadata.unwrap_or_default(),
    };
    created("contribution recorded", state.ledger.create_contribution(user, req)?)
}

/// Transaction details
///
/// GET /api/v1/transactions/{id}
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    params(("id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction details"),
        (status = 404, description = "Unknown transaction")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<TxnId>,
) -> ApiResult<Transaction> {
    let txn = state.ledger.transaction(id)?;
    // Any member of the group may inspect its ledger entries.
    state.groups.group_details(txn.group, user)?;
    ok("transaction details", txn)
}

/// Transactions the caller has paid
///
/// GET /api/v1/transactions/mine
#[utoipa::path(
    get,
    path = "/api/v1/transactions/mine",
    responses((status = 200, description = "Own transactions, newest first")),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn my_transactions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<Vec<Transaction>> {
    ok("transactions", state.ledger.user_transactions(user))
}

/// Confirm a pending transaction (ledger side only)
///
/// POST /api/v1/transactions/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/confirm",
    params(("id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction confirmed"),
        (status = 409, description = "Transaction already terminal")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn confirm_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<TxnId>,
) -> ApiResult<Transaction> {
    let txn = state.ledger.transaction(id)?;
    payer_or_admin_gate(&state, &txn, user)?;
    ok("transaction confirmed", state.ledger.confirm_transaction(id)?)
}

/// Confirm and settle a contribution into its round in one command
///
/// POST /api/v1/transactions/{id}/settle
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/settle",
    params(("id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Contribution settled; round state returned"),
        (status = 409, description = "Participant already paid or transaction terminal")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn settle_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<TxnId>,
) -> ApiResult<Round> {
    let txn = state.ledger.transaction(id)?;
    payer_or_admin_gate(&state, &txn, user)?;
    ok(
        "contribution settled",
        state.settlement.settle_contribution(id).await?,
    )
}

/// Mark a pending transaction as failed
///
/// POST /api/v1/transactions/{id}/fail
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/fail",
    params(("id" = String, Path, description = "Transaction id")),
    request_body = FailBody,
    responses(
        (status = 200, description = "Transaction failed"),
        (status = 409, description = "Transaction already terminal")
    ),
    security(("bearer_jwt" = [])),
    tag = "Transactions"
)]
pub async fn fail_transaction(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<TxnId>,
    Json(body): Json<FailBody>,
) -> ApiResult<Transaction> {
    check_payload(&body)?;
    let txn = state.ledger.transaction(id)?;
    payer_or_admin_gate(&state, &txn, user)?;
    ok(
        "transaction failed",
        state.ledger.fail_transaction(id, &body.reason)?,
    )
}

/// Open a dispute on a transaction
///
/// POST /api/v1/transactions/{id}/dispute
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/dispute",
    params(("id" = String, Path, description = "Transaction id")),
    request_body = DisputeBody,
    responses(
        (status = 200, description = "Dispute opened"),
        (status = 400, description = "Reason too short"),
        (status = 409, description = "Already disputed")
    ),
    security(("bearer_jwt" = [])),
    tag = "Disputes"
)]
pub async fn create_dispute(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<TxnId>,
    Json(body): Json<DisputeBody>,
) -> ApiResult<Transaction> {
    check_payload(&body)?;
    let txn = state.ledger.transaction(id)?;
    // Members of the group may flag any of its transactions.
    state.groups.group_details(txn.group, user)?;
    ok(
        "dispute opened",
        state.ledger.create_dispute(id, user, &body.reason).await?,
    )
}

/// Resolve a dispute (group admin only)
///
/// POST /api/v1/transactions/{id}/dispute/resolve
#[utoipa::path(
    post,
    path = "/api/v1/transactions/{id}/dispute/resolve",
    params(("id" = String, Path, description = "Transaction id")),
    request_body = ResolveDisputeBody,
    responses(
        (status = 200, description = "Dispute resolved"),
        (status = 403, description = "Group administrator required"),
        (status = 409, description = "Dispute already resolved")
    ),
    security(("bearer_jwt" = [])),
    tag = "Disputes"
)]
pub async fn resolve_dispute(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<TxnId>,
    Json(body): Json<ResolveDisputeBody>,
) -> ApiResult<Transaction> {
    check_payload(&body)?;
    let txn = state.ledger.transaction(id)?;
    super::group_admin_gate(&state, txn.group, user)?;
    ok(
        "dispute resolved",
        state
            .ledger
            .resolve_dispute(id, user, body.accepted, &body.resolution)
            .await?,
    )
}
