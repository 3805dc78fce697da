//! Group, membership, and contribution-settings types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::{GroupId, RoundId, UserId};
use crate::money::Amount;

/// Contribution cadence. One round spans one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    pub fn period_days(&self) -> i64 {
        match self {
            Frequency::Weekly => 7,
            Frequency::Biweekly => 15,
            Frequency::Monthly => 30,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::days(self.period_days())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContributionSettings {
    /// Fixed amount every participant owes per round.
    pub amount: Amount,
    pub frequency: Frequency,
    /// Day of the period by which payment is expected (1-based).
    pub payment_deadline_day: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupRules {
    pub min_reliability_score: u8,
    pub max_members: u32,
}

impl Default for GroupRules {
    fn default() -> Self {
        Self {
            min_reliability_score: 0,
            max_members: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Pending,
    Active,
    Completed,
    Suspended,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Pending => "pending",
            GroupStatus::Active => "active",
            GroupStatus::Completed => "completed",
            GroupStatus::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    /// Soft removal: excluded from rotation, retained for history.
    Left,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupMember {
    pub user_id: UserId,
    pub role: MemberRole,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
}

/// A savings group. Owns its member list; holds only a weak reference to the
/// current round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub creator: UserId,
    pub contribution_settings: ContributionSettings,
    pub rules: GroupRules,
    pub status: GroupStatus,
    pub members: Vec<GroupMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<RoundId>,
    pub total_rounds: u32,
    pub total_collected: Amount,
    pub total_distributed: Amount,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_end_date: Option<DateTime<Utc>>,
}

impl Group {
    pub fn new(
        creator: UserId,
        name: String,
        description: String,
        contribution_settings: ContributionSettings,
        rules: GroupRules,
    ) -> Self {
        Self {
            id: GroupId::new(),
            name,
            description,
            creator,
            contribution_settings,
            rules,
            status: GroupStatus::Pending,
            members: vec![GroupMember {
                user_id: creator,
                role: MemberRole::Admin,
                status: MembershipStatus::Active,
                joined_at: Utc::now(),
            }],
            current_round: None,
            total_rounds: 0,
            total_collected: Amount::ZERO,
            total_distributed: Amount::ZERO,
            created_at: Utc::now(),
            start_date: None,
            expected_end_date: None,
            actual_end_date: None,
        }
    }

    pub fn member(&self, user: UserId) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.user_id == user)
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.member(user).is_some_and(|m| {
            m.role == MemberRole::Admin && m.status == MembershipStatus::Active
        })
    }

    pub fn is_active_member(&self, user: UserId) -> bool {
        self.member(user)
            .is_some_and(|m| m.status == MembershipStatus::Active)
    }

    /// Active members in membership order.
    pub fn active_members(&self) -> impl Iterator<Item = &GroupMember> {
        self.members
            .iter()
            .filter(|m| m.status == MembershipStatus::Active)
    }

    pub fn active_member_count(&self) -> u32 {
        self.active_members().count() as u32
    }

    /// A rotation needs at least two contributors.
    pub fn can_start(&self) -> bool {
        self.active_member_count() >= 2
    }
}
