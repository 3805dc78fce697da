//! Member, KYC, and reliability types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core_types::UserId;

/// KYC verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    NotStarted,
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::NotStarted => "not_started",
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }
}

/// Identity documents submitted for review. Image fields hold opaque storage
/// paths, not raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KycSubmission {
    pub national_id_number: String,
    pub national_id_image: String,
    pub selfie_image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct KycRecord {
    pub status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<KycSubmission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Platform-level role. Group administration is separate (see
/// [`crate::group::MemberRole`]); this role gates operator actions such as
/// KYC review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// Outcome of one contribution, reported by the round engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    OnTime,
    Late,
    Missed,
}

/// Payment-history counters. The score is derived, never stored, so it
/// cannot drift from the counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct Reliability {
    pub total_contributions: u32,
    pub on_time_payments: u32,
    pub late_payments: u32,
    pub missed_payments: u32,
}

impl Reliability {
    const BASE_SCORE: i64 = 50;

    /// Score in [0, 100]: base 50, +2 per on-time, -4 per late, -10 per
    /// missed contribution.
    pub fn score(&self) -> u8 {
        let raw = Self::BASE_SCORE + 2 * i64::from(self.on_time_payments)
            - 4 * i64::from(self.late_payments)
            - 10 * i64::from(self.missed_payments);
        raw.clamp(0, 100) as u8
    }

    pub fn record(&mut self, outcome: PaymentOutcome) {
        self.total_contributions += 1;
        match outcome {
            PaymentOutcome::OnTime => self.on_time_payments += 1,
            PaymentOutcome::Late => self.late_payments += 1,
            PaymentOutcome::Missed => self.missed_payments += 1,
        }
    }
}

/// Registered member record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string; never serialized out.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub kyc: KycRecord,
    pub reliability: Reliability,
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// KYC gate for sensitive actions (creating or joining a group).
    pub fn kyc_verified(&self) -> bool {
        self.kyc.status == KycStatus::Verified
    }

    pub fn profile(&self) -> MemberProfile {
        MemberProfile {
            id: self.id,
            username: self.username.clone(),
            reliability_score: self.reliability.score(),
            kyc_verified: self.kyc_verified(),
            is_active: self.is_active,
        }
    }
}

/// The projection of a member the rest of the engine sees.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberProfile {
    pub id: UserId,
    pub username: String,
    pub reliability_score: u8,
    pub kyc_verified: bool,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_member_score_is_base() {
        assert_eq!(Reliability::default().score(), 50);
    }

    #[test]
    fn test_score_rewards_on_time_and_clamps() {
        let mut r = Reliability::default();
        for _ in 0..30 {
            r.record(PaymentOutcome::OnTime);
        }
        assert_eq!(r.score(), 100);
        assert_eq!(r.total_contributions, 30);
    }

    #[test]
    fn test_score_penalizes_misses_and_floors_at_zero() {
        let mut r = Reliability::default();
        for _ in 0..6 {
            r.record(PaymentOutcome::Missed);
        }
        assert_eq!(r.score(), 0);
    }

    #[test]
    fn test_score_mixed_history() {
        let mut r = Reliability::default();
        r.record(PaymentOutcome::OnTime);
        r.record(PaymentOutcome::OnTime);
        r.record(PaymentOutcome::Late);
        // 50 + 2*2 - 4 = 50
        assert_eq!(r.score(), 50);
        assert_eq!(r.total_contributions, 3);
    }
}
