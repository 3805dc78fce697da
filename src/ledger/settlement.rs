//! Settlement command and reconciliation.
//!
//! Confirming a transaction and marking the round payment are two writes on
//! two entities; no store transaction spans both. This coordinator packages
//! them as one command with a pre-flight check, absorbs duplicate-settle
//! races idempotently, and re-drives the round side of any confirmed
//! contribution a crash left unapplied.

use std::sync::Arc;

use crate::core_types::{RoundId, TxnId};
use crate::error::{CoreError, CoreResult};
use crate::round::{Round, RoundEngine};

use super::service::LedgerService;
use super::types::{TransactionStatus, TransactionType};

pub struct SettlementCoordinator {
    ledger: Arc<LedgerService>,
    engine: Arc<RoundEngine>,
}

impl SettlementCoordinator {
    pub fn new(ledger: Arc<LedgerService>, engine: Arc<RoundEngine>) -> Self {
        Self { ledger, engine }
    }

    /// Confirm a pending contribution and settle it into its round.
    ///
    /// Safe to call again for the same transaction: a contribution that
    /// already settled returns the round unchanged. A transaction confirmed
    /// earlier whose round update never landed is re-driven here.
    pub async fn settle_contribution(&self, txn_id: TxnId) -> CoreResult<Round> {
        let txn = self.ledger.transaction(txn_id)?;
        if txn.txn_type != TransactionType::Contribution {
            return Err(CoreError::validation(
                "only contributions settle into a round",
            ));
        }
        match txn.status {
            TransactionStatus::Pending | TransactionStatus::Confirmed => {}
            TransactionStatus::Failed | TransactionStatus::Cancelled => {
                return Err(CoreError::conflict(format!(
                    "transaction is {}",
                    txn.status.as_str()
                )));
            }
        }

        // Pre-flight before committing the confirmation: the participant
        // must exist and still owe.
        let round = self.engine.round(txn.round)?;
        let participant = round
            .participant(txn.payer)
            .ok_or_else(|| CoreError::not_found("participant in round"))?;
        if participant.has_paid {
            if participant.transaction == Some(txn_id) {
                return Ok(round);
            }
            return Err(CoreError::conflict(
                "participant has already paid this round",
            ));
        }

        if txn.status == TransactionStatus::Pending {
            self.ledger.confirm_transaction(txn_id)?;
        }

        match self.engine.mark_payment_done(txn.round, txn.payer, txn_id).await {
            Ok(round) => Ok(round),
            Err(CoreError::Conflict(msg)) => {
                // Lost a race: if the winner applied this same transaction,
                // the command still succeeded.
                let round = self.engine.round(txn.round)?;
                let settled_by_us = round
                    .participant(txn.payer)
                    .and_then(|p| p.transaction)
                    == Some(txn_id);
                if settled_by_us {
                    Ok(round)
                } else {
                    Err(CoreError::conflict(msg))
                }
            }
            Err(e) => {
                tracing::error!(
                    txn = %txn_id,
                    round = %txn.round,
                    error = %e,
                    "transaction confirmed but round not updated; run reconcile_round"
                );
                Err(e)
            }
        }
    }

    /// Re-apply confirmed contributions whose round payment never landed.
    /// Returns how many were applied.
    pub async fn reconcile_round(&self, round_id: RoundId) -> CoreResult<u32> {
        let round = self.engine.round(round_id)?;
        let mut applied = 0;
        for txn in self.ledger.confirmed_contributions_for_round(round_id) {
            let owes = round
                .participant(txn.payer)
                .is_some_and(|p| !p.has_paid);
            if !owes {
                continue;
            }
            match self.engine.mark_payment_done(round_id, txn.payer, txn.id).await {
                Ok(_) => applied += 1,
                // Raced with a live settle; already applied.
                Err(CoreError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if applied > 0 {
            tracing::info!(round = %round_id, applied, "reconciliation applied confirmed contributions");
        }
        Ok(applied)
    }
}
