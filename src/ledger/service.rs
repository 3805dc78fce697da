//! Transaction lifecycle and dispute operations.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::core_types::{GroupId, RoundId, TxnId, UserId};
use crate::error::{CoreError, CoreResult};
use crate::group::Group;
use crate::money::Amount;
use crate::notify::{NotificationKind, NotificationSink};
use crate::round::Round;
use crate::store::Store;

use super::types::{
    Dispute, DisputeStatus, PaymentMethod, Transaction, TransactionStatus, TransactionType,
    TxnMetadata, new_reference,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContributionRequest {
    pub group: GroupId,
    pub round: RoundId,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub metadata: TxnMetadata,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct TransactionFilter {
    pub txn_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Clone, serde::Serialize, ToSchema)]
pub struct TransactionStats {
    pub total_count: u32,
    pub pending_count: u32,
    pub confirmed_count: u32,
    pub failed_count: u32,
    pub disputed_count: u32,
    pub confirmed_contribution_volume: Amount,
    pub confirmed_distribution_volume: Amount,
}

pub struct LedgerService {
    txns: Arc<Store<TxnId, Transaction>>,
    rounds: Arc<Store<RoundId, Round>>,
    groups: Arc<Store<GroupId, Group>>,
    notifier: Arc<dyn NotificationSink>,
}

impl LedgerService {
    pub fn new(
        txns: Arc<Store<TxnId, Transaction>>,
        rounds: Arc<Store<RoundId, Round>>,
        groups: Arc<Store<GroupId, Group>>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            txns,
            rounds,
            groups,
            notifier,
        }
    }

    /// Record a pending contribution against a round.
    pub fn create_contribution(&self, payer: UserId, req: ContributionRequest) -> CoreResult<Transaction> {
        self.groups.require(&req.group)?;
        let round = self.rounds.require(&req.round)?;
        if round.group != req.group {
            return Err(CoreError::validation("round does not belong to this group"));
        }
        round
            .participant(payer)
            .ok_or_else(|| CoreError::not_found("participant in round"))?;
        if req.amount.is_zero() {
            return Err(CoreError::validation("transaction amount must be positive"));
        }

        let txn = Transaction {
            id: TxnId::new(),
            group: req.group,
            round: req.round,
            payer,
            recipient: None,
            amount: req.amount,
            txn_type: TransactionType::Contribution,
            status: TransactionStatus::Pending,
            reference: new_reference(),
            payment_method: req.payment_method,
            metadata: req.metadata,
            created_at: Utc::now(),
            confirmed_at: None,
            failed_at: None,
            failure_reason: None,
            dispute: None,
        };
        self.txns.insert(txn.id, txn.clone())?;
        tracing::info!(
            txn = %txn.id,
            reference = %txn.reference,
            payer = %payer,
            amount = %txn.amount,
            "contribution recorded"
        );
        Ok(txn)
    }

    /// pending -> confirmed. Terminal states reject with Conflict.
    ///
    /// The caller is responsible for settling the round afterwards; see
    /// [`super::SettlementCoordinator`] for the packaged command.
    pub fn confirm_transaction(&self, id: TxnId) -> CoreResult<Transaction> {
        let txn = self.txns.update(&id, |t| {
            if t.status.is_terminal() {
                return Err(CoreError::conflict(format!(
                    "transaction is already {}",
                    t.status.as_str()
                )));
            }
            t.status = TransactionStatus::Confirmed;
            t.confirmed_at = Some(Utc::now());
            Ok(t.clone())
        })?;
        tracing::info!(txn = %id, reference = %txn.reference, "transaction confirmed");
        Ok(txn)
    }

    /// pending -> failed. Terminal; confirm-after-fail rejects with Conflict.
    pub fn fail_transaction(&self, id: TxnId, reason: &str) -> CoreResult<Transaction> {
        let txn = self.txns.update(&id, |t| {
            if t.status.is_terminal() {
                return Err(CoreError::conflict(format!(
                    "transaction is already {}",
                    t.status.as_str()
                )));
            }
            t.status = TransactionStatus::Failed;
            t.failed_at = Some(Utc::now());
            t.failure_reason = Some(reason.to_string());
            Ok(t.clone())
        })?;
        tracing::warn!(txn = %id, reason, "transaction failed");
        Ok(txn)
    }

    /// Open a dispute on a transaction.
    pub async fn create_dispute(
        &self,
        id: TxnId,
        opened_by: UserId,
        reason: &str,
    ) -> CoreResult<Transaction> {
        let reason = reason.trim();
        if reason.chars().count() < 10 {
            return Err(CoreError::validation(
                "dispute reason must be at least 10 characters",
            ));
        }

        let txn = self.txns.update(&id, |t| {
            if t.dispute.is_some() {
                return Err(CoreError::conflict("transaction is already disputed"));
            }
            t.dispute = Some(Dispute {
                opened_at: Utc::now(),
                opened_by,
                reason: reason.to_string(),
                status: DisputeStatus::InProgress,
                resolved_at: None,
                resolved_by: None,
                resolution: None,
            });
            Ok(t.clone())
        })?;

        self.notifier
            .notify(
                txn.payer,
                NotificationKind::DisputeOpened {
                    transaction: id,
                    reason: reason.to_string(),
                },
            )
            .await;
        tracing::info!(txn = %id, opened_by = %opened_by, "dispute opened");
        Ok(txn)
    }

    /// Close a dispute. Admin gating happens at the boundary layer.
    pub async fn resolve_dispute(
        &self,
        id: TxnId,
        resolved_by: UserId,
        accepted: bool,
        resolution: &str,
    ) -> CoreResult<Transaction> {
        let txn = self.txns.update(&id, |t| {
            let dispute = t
                .dispute
                .as_mut()
                .ok_or_else(|| CoreError::not_found("dispute on transaction"))?;
            if dispute.status != DisputeStatus::InProgress {
                return Err(CoreError::conflict("dispute has already been resolved"));
            }
            dispute.status = if accepted {
                DisputeStatus::Resolved
            } else {
                DisputeStatus::Rejected
            };
            dispute.resolved_at = Some(Utc::now());
            dispute.resolved_by = Some(resolved_by);
            dispute.resolution = Some(resolution.to_string());
            Ok(t.clone())
        })?;

        self.notifier
            .notify(
                txn.payer,
                NotificationKind::DisputeResolved {
                    transaction: id,
                    resolution: resolution.to_string(),
                },
            )
            .await;
        tracing::info!(txn = %id, accepted, "dispute resolved");
        Ok(txn)
    }

    pub fn transaction(&self, id: TxnId) -> CoreResult<Transaction> {
        self.txns.require(&id)
    }

    /// Transactions of a group, newest first, optionally filtered.
    pub fn group_transactions(
        &self,
        group: GroupId,
        filter: TransactionFilter,
    ) -> CoreResult<Vec<Transaction>> {
        self.groups.require(&group)?;
        let mut txns = self.txns.filter(|t| {
            t.group == group
                && filter.txn_type.is_none_or(|ty| t.txn_type == ty)
                && filter.status.is_none_or(|s| t.status == s)
        });
        txns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txns)
    }

    /// Transactions a user has paid, newest first.
    pub fn user_transactions(&self, payer: UserId) -> Vec<Transaction> {
        let mut txns = self.txns.filter(|t| t.payer == payer);
        txns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        txns
    }

    /// Confirmed contributions recorded against a round, used by settlement
    /// reconciliation.
    pub fn confirmed_contributions_for_round(&self, round: RoundId) -> Vec<Transaction> {
        self.txns.filter(|t| {
            t.round == round
                && t.txn_type == TransactionType::Contribution
                && t.status == TransactionStatus::Confirmed
        })
    }

    pub fn transaction_stats(&self, group: GroupId) -> CoreResult<TransactionStats> {
        self.groups.require(&group)?;
        let txns = self.txns.filter(|t| t.group == group);

        let mut stats = TransactionStats {
            total_count: txns.len() as u32,
            pending_count: 0,
            confirmed_count: 0,
            failed_count: 0,
            disputed_count: 0,
            confirmed_contribution_volume: Amount::ZERO,
            confirmed_distribution_volume: Amount::ZERO,
        };
        for t in &txns {
            match t.status {
                TransactionStatus::Pending => stats.pending_count += 1,
                TransactionStatus::Confirmed => stats.confirmed_count += 1,
                TransactionStatus::Failed => stats.failed_count += 1,
                TransactionStatus::Cancelled => {}
            }
            if t.is_disputed() {
                stats.disputed_count += 1;
            }
            if t.status == TransactionStatus::Confirmed {
                let bucket = match t.txn_type {
                    TransactionType::Contribution => &mut stats.confirmed_contribution_volume,
                    TransactionType::Distribution => &mut stats.confirmed_distribution_volume,
                    TransactionType::Penalty => continue,
                };
                *bucket = bucket
                    .checked_add(t.amount)
                    .map_err(|_| CoreError::validation("transaction volume overflows"))?;
            }
        }
        Ok(stats)
    }
}
