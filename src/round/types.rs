//! Round, beneficiary, and participant types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{GroupId, RoundId, TxnId, UserId};
use crate::money::{self, Amount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Active => "active",
            RoundStatus::Completed => "completed",
            RoundStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    OnTime,
    Late,
    Unpaid,
}

/// The member entitled to this round's pooled funds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Beneficiary {
    pub user_id: UserId,
    /// 1-based rotation position.
    pub position: u32,
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    pub received_amount: Amount,
}

/// One member's obligation in a round. The contribution amount is a snapshot
/// taken at round creation, immune to later settings changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    pub user_id: UserId,
    pub contribution_amount: Amount,
    pub has_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TxnId>,
}

impl Participant {
    pub fn new(user_id: UserId, contribution_amount: Amount) -> Self {
        Self {
            user_id,
            contribution_amount,
            has_paid: false,
            paid_at: None,
            payment_status: PaymentStatus::Pending,
            transaction: None,
        }
    }
}

/// One cycle of the rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub group: GroupId,
    /// 1-based, unique per group.
    pub round_number: u32,
    pub beneficiary: Beneficiary,
    pub participants: Vec<Participant>,
    /// contribution_amount x participant count, fixed at creation.
    pub total_amount: Amount,
    pub collected_amount: Amount,
    pub distributed_amount: Amount,
    pub status: RoundStatus,
    pub start_date: DateTime<Utc>,
    pub expected_end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl Round {
    pub fn participant(&self, user: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user)
    }

    pub fn all_paid(&self) -> bool {
        self.participants.iter().all(|p| p.has_paid)
    }

    /// Participants past the deadline who still owe, as of `now`.
    pub fn late_participants(&self, now: DateTime<Utc>) -> Vec<&Participant> {
        if self.expected_end_date >= now {
            return Vec::new();
        }
        self.participants.iter().filter(|p| !p.has_paid).collect()
    }

    pub fn collection_percentage(&self) -> u8 {
        money::collection_percentage(self.collected_amount, self.total_amount)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> RoundStats {
        RoundStats {
            round_number: self.round_number,
            status: self.status,
            total_amount: self.total_amount,
            collected_amount: self.collected_amount,
            distributed_amount: self.distributed_amount,
            collection_percentage: self.collection_percentage(),
            paid_count: self.participants.iter().filter(|p| p.has_paid).count() as u32,
            total_participants: self.participants.len() as u32,
            late_count: self.late_participants(now).len() as u32,
            start_date: self.start_date,
            expected_end_date: self.expected_end_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoundStats {
    pub round_number: u32,
    pub status: RoundStatus,
    pub total_amount: Amount,
    pub collected_amount: Amount,
    pub distributed_amount: Amount,
    pub collection_percentage: u8,
    pub paid_count: u32,
    pub total_participants: u32,
    pub late_count: u32,
    pub start_date: DateTime<Utc>,
    pub expected_end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}
