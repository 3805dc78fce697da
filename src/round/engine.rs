//! Round succession and settlement tracking.

use std::sync::Arc;

use chrono::Utc;

use crate::core_types::{GroupId, RoundId, TxnId, UserId};
use crate::error::{CoreError, CoreResult};
use crate::group::{Group, GroupStatus};
use crate::money::Amount;
use crate::notify::{NotificationKind, NotificationSink};
use crate::registry::{MemberDirectory, MemberProfile, PaymentOutcome};
use crate::store::Store;

use super::types::{Beneficiary, Participant, PaymentStatus, Round, RoundStats, RoundStatus};

pub struct RoundEngine {
    rounds: Arc<Store<RoundId, Round>>,
    groups: Arc<Store<GroupId, Group>>,
    directory: Arc<dyn MemberDirectory>,
    notifier: Arc<dyn NotificationSink>,
}

impl RoundEngine {
    pub fn new(
        rounds: Arc<Store<RoundId, Round>>,
        groups: Arc<Store<GroupId, Group>>,
        directory: Arc<dyn MemberDirectory>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            rounds,
            groups,
            directory,
            notifier,
        }
    }

    /// Open the next round for a group.
    ///
    /// The beneficiary index is `(round_number - 1) mod order length`, so the
    /// rotation wraps and every ordered member is served exactly once per
    /// full cycle. Each participant's obligation snapshots the group's
    /// contribution amount at creation time.
    pub async fn create_round(
        &self,
        group_id: GroupId,
        order: &[MemberProfile],
    ) -> CoreResult<Round> {
        let group = self.groups.require(&group_id)?;
        if order.is_empty() {
            return Err(CoreError::validation("rotation order must not be empty"));
        }

        let round_number = self
            .rounds
            .filter(|r| r.group == group_id)
            .iter()
            .map(|r| r.round_number)
            .max()
            .unwrap_or(0)
            + 1;
        let beneficiary_index = ((round_number - 1) as usize) % order.len();
        let amount = group.contribution_settings.amount;
        let total_amount = amount
            .checked_mul(order.len() as u64)
            .map_err(|_| CoreError::validation("round total overflows"))?;

        let now = Utc::now();
        let round = Round {
            id: RoundId::new(),
            group: group_id,
            round_number,
            beneficiary: Beneficiary {
                user_id: order[beneficiary_index].id,
                position: beneficiary_index as u32 + 1,
                received: false,
                received_at: None,
                received_amount: Amount::ZERO,
            },
            participants: order
                .iter()
                .map(|p| Participant::new(p.id, amount))
                .collect(),
            total_amount,
            collected_amount: Amount::ZERO,
            distributed_amount: Amount::ZERO,
            status: RoundStatus::Active,
            start_date: now,
            expected_end_date: now + group.contribution_settings.frequency.period(),
            end_date: None,
        };

        self.rounds.insert(round.id, round.clone())?;
        self.groups.update(&group_id, |g| {
            g.current_round = Some(round.id);
            g.total_rounds += 1;
            Ok(())
        })?;

        tracing::info!(
            group_id = %group_id,
            round_id = %round.id,
            round_number,
            beneficiary = %round.beneficiary.user_id,
            total = %total_amount,
            "round created"
        );
        Ok(round)
    }

    /// Record one participant's payment.
    ///
    /// Serialized per round by the store guard, so concurrent payments can
    /// neither double-count `collected_amount` nor miss the completion edge.
    /// When the last participant pays, the round completes and its totals
    /// propagate to the group.
    pub async fn mark_payment_done(
        &self,
        round_id: RoundId,
        user: UserId,
        txn: TxnId,
    ) -> CoreResult<Round> {
        let now = Utc::now();
        let (round, outcome, completed) = self.rounds.update(&round_id, |r| {
            if r.status != RoundStatus::Active {
                return Err(CoreError::conflict(format!(
                    "round is {}, payments are closed",
                    r.status.as_str()
                )));
            }
            let idx = r
                .participants
                .iter()
                .position(|p| p.user_id == user)
                .ok_or_else(|| CoreError::not_found("participant in round"))?;
            if r.participants[idx].has_paid {
                return Err(CoreError::conflict("payment has already been made"));
            }

            let late = now > r.expected_end_date;
            let contribution = r.participants[idx].contribution_amount;
            let collected = r
                .collected_amount
                .checked_add(contribution)
                .map_err(|_| CoreError::validation("collected amount overflows"))?;

            let p = &mut r.participants[idx];
            p.has_paid = true;
            p.paid_at = Some(now);
            p.payment_status = if late {
                PaymentStatus::Late
            } else {
                PaymentStatus::OnTime
            };
            p.transaction = Some(txn);
            r.collected_amount = collected;

            let completed = r.all_paid();
            if completed {
                r.status = RoundStatus::Completed;
                r.end_date = Some(now);
                r.beneficiary.received = true;
                r.beneficiary.received_at = Some(now);
                r.beneficiary.received_amount = r.collected_amount;
                r.distributed_amount = r.collected_amount;
            }
            let outcome = if late {
                PaymentOutcome::Late
            } else {
                PaymentOutcome::OnTime
            };
            Ok((r.clone(), outcome, completed))
        })?;

        // Reliability history is advisory enrichment; a registry miss must
        // not roll back a recorded payment.
        if let Err(e) = self.directory.record_payment_outcome(user, outcome).await {
            tracing::warn!(user_id = %user, error = %e, "payment outcome not recorded");
        }
        self.notifier
            .notify(
                round.beneficiary.user_id,
                NotificationKind::PaymentReceived {
                    round: round_id,
                    payer: user,
                    amount: round
                        .participant(user)
                        .map(|p| p.contribution_amount)
                        .unwrap_or(Amount::ZERO),
                    late: outcome == PaymentOutcome::Late,
                },
            )
            .await;

        if completed {
            self.groups.update(&round.group, |g| {
                g.total_collected = g
                    .total_collected
                    .checked_add(round.collected_amount)
                    .map_err(|_| CoreError::validation("group collected total overflows"))?;
                g.total_distributed = g
                    .total_distributed
                    .checked_add(round.distributed_amount)
                    .map_err(|_| CoreError::validation("group distributed total overflows"))?;
                Ok(())
            })?;

            for p in &round.participants {
                self.notifier
                    .notify(
                        p.user_id,
                        NotificationKind::RoundCompleted {
                            round: round_id,
                            round_number: round.round_number,
                            collected: round.collected_amount,
                        },
                    )
                    .await;
            }
            self.notifier
                .notify(
                    round.beneficiary.user_id,
                    NotificationKind::PayoutSent {
                        round: round_id,
                        amount: round.distributed_amount,
                    },
                )
                .await;
            tracing::info!(
                round_id = %round_id,
                collected = %round.collected_amount,
                "round completed, payout released"
            );
        }

        Ok(round)
    }

    /// Close an active round and open the next one, or complete the group
    /// when the cycle has served every active member.
    ///
    /// The rotation order is recomputed from current reliability scores:
    /// scores move between rounds and the next beneficiary is decided on
    /// fresh data, not the order cached at group start.
    pub async fn complete_round_and_create_next(&self, round_id: RoundId) -> CoreResult<Round> {
        let round = self.rounds.require(&round_id)?;
        if round.status == RoundStatus::Cancelled {
            return Err(CoreError::conflict("round is cancelled"));
        }
        let group_id = round.group;

        // Claim the advance under the group guard: only the round currently
        // referenced by the group can move it forward, so concurrent calls
        // race to a single winner.
        self.groups.update(&group_id, |g| {
            if g.status == GroupStatus::Completed {
                return Err(CoreError::conflict("group is already completed"));
            }
            if g.current_round != Some(round_id) {
                return Err(CoreError::conflict("round has already been advanced"));
            }
            g.current_round = None;
            Ok(())
        })?;

        // A round that settled itself through payments is already completed;
        // an admin advancing a stalled round closes it here.
        let completed = self.rounds.update(&round_id, |r| {
            if r.status == RoundStatus::Active {
                r.status = RoundStatus::Completed;
                r.end_date = Some(Utc::now());
            }
            Ok(r.clone())
        })?;

        let group = self.groups.require(&group_id)?;
        if completed.round_number < group.active_member_count() {
            let mut order = Vec::with_capacity(group.active_member_count() as usize);
            for m in group.active_members() {
                order.push(self.directory.get_member(m.user_id).await?);
            }
            order.sort_by_key(|p| p.reliability_score);
            self.create_round(group_id, &order).await?;
        } else {
            self.groups.update(&group_id, |g| {
                g.status = GroupStatus::Completed;
                g.actual_end_date = Some(Utc::now());
                Ok(())
            })?;
            let total = self.groups.require(&group_id)?.total_distributed;
            for m in group.active_members() {
                self.notifier
                    .notify(
                        m.user_id,
                        NotificationKind::GroupCompleted {
                            group: group_id,
                            total_distributed: total,
                        },
                    )
                    .await;
            }
            tracing::info!(group_id = %group_id, "rotation cycle finished, group completed");
        }

        Ok(completed)
    }

    /// Cancel an active round. Participants who never paid are marked unpaid
    /// and the miss lands in their reliability history.
    pub async fn cancel_round(&self, round_id: RoundId) -> CoreResult<Round> {
        let round = self.rounds.update(&round_id, |r| {
            if r.status != RoundStatus::Active {
                return Err(CoreError::conflict("round is not active"));
            }
            r.status = RoundStatus::Cancelled;
            r.end_date = Some(Utc::now());
            for p in r.participants.iter_mut().filter(|p| !p.has_paid) {
                p.payment_status = PaymentStatus::Unpaid;
            }
            Ok(r.clone())
        })?;

        for p in round.participants.iter().filter(|p| !p.has_paid) {
            if let Err(e) = self
                .directory
                .record_payment_outcome(p.user_id, PaymentOutcome::Missed)
                .await
            {
                tracing::warn!(user_id = %p.user_id, error = %e, "missed outcome not recorded");
            }
        }
        tracing::info!(round_id = %round_id, "round cancelled");
        Ok(round)
    }

    /// Participants past the deadline who still owe. Pure query.
    pub fn late_participants(&self, round_id: RoundId) -> CoreResult<Vec<Participant>> {
        let round = self.rounds.require(&round_id)?;
        let now = Utc::now();
        Ok(round
            .late_participants(now)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn round_stats(&self, round_id: RoundId) -> CoreResult<RoundStats> {
        Ok(self.rounds.require(&round_id)?.stats(Utc::now()))
    }

    pub fn round(&self, round_id: RoundId) -> CoreResult<Round> {
        self.rounds.require(&round_id)
    }

    /// Rounds of a group, newest first.
    pub fn group_rounds(&self, group_id: GroupId) -> CoreResult<Vec<Round>> {
        self.groups.require(&group_id)?;
        let mut rounds = self.rounds.filter(|r| r.group == group_id);
        rounds.sort_by(|a, b| b.round_number.cmp(&a.round_number));
        Ok(rounds)
    }

    pub fn current_round(&self, group_id: GroupId) -> CoreResult<Option<Round>> {
        self.groups.require(&group_id)?;
        Ok(self
            .rounds
            .filter(|r| r.group == group_id && r.status == RoundStatus::Active)
            .into_iter()
            .next())
    }

    /// Recompute the group's aggregates from the round store.
    ///
    /// total_rounds counts every round ever created; collected/distributed
    /// totals sum completed rounds, matching what incremental propagation
    /// writes. Repairs drift after a partial failure.
    pub fn recompute_group_totals(&self, group_id: GroupId) -> CoreResult<Group> {
        let rounds = self.rounds.filter(|r| r.group == group_id);
        let total_rounds = rounds.len() as u32;
        let mut collected = Amount::ZERO;
        let mut distributed = Amount::ZERO;
        for r in rounds.iter().filter(|r| r.status == RoundStatus::Completed) {
            collected = collected
                .checked_add(r.collected_amount)
                .map_err(|_| CoreError::validation("group collected total overflows"))?;
            distributed = distributed
                .checked_add(r.distributed_amount)
                .map_err(|_| CoreError::validation("group distributed total overflows"))?;
        }
        self.groups.update(&group_id, |g| {
            g.total_rounds = total_rounds;
            g.total_collected = collected;
            g.total_distributed = distributed;
            Ok(g.clone())
        })
    }
}
