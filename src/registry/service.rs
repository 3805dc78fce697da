//! Registry service and the directory seam consumed by the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::core_types::UserId;
use crate::error::{CoreError, CoreResult};
use crate::store::Store;

use super::types::{
    KycStatus, KycSubmission, Member, MemberProfile, PaymentOutcome, Reliability, UserRole,
};

/// What the group and round services need from the registry.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn get_member(&self, id: UserId) -> CoreResult<MemberProfile>;

    /// Feed a payment outcome into the member's reliability history.
    async fn record_payment_outcome(&self, id: UserId, outcome: PaymentOutcome) -> CoreResult<()>;
}

/// In-memory member registry.
pub struct MemberRegistry {
    members: Store<UserId, Member>,
    next_id: AtomicU64,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self {
            members: Store::new("member"),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new member. Usernames and emails are unique.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> CoreResult<Member> {
        let taken = !self
            .members
            .filter(|m| m.email == email || m.username == username)
            .is_empty();
        if taken {
            return Err(CoreError::conflict("username or email already registered"));
        }

        let member = Member {
            id: UserId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: UserRole::User,
            is_active: true,
            kyc: Default::default(),
            reliability: Reliability::default(),
            created_at: Utc::now(),
        };
        self.members.insert(member.id, member.clone())?;
        tracing::info!(user_id = %member.id, username, "member registered");
        Ok(member)
    }

    pub fn get(&self, id: UserId) -> CoreResult<Member> {
        self.members.require(&id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<Member> {
        self.members.filter(|m| m.email == email).into_iter().next()
    }

    /// Submit identity documents for review.
    pub fn submit_kyc(&self, user: UserId, submission: KycSubmission) -> CoreResult<Member> {
        self.members.update(&user, |m| {
            if m.kyc.status == KycStatus::Verified {
                return Err(CoreError::conflict("KYC is already verified"));
            }
            m.kyc.status = KycStatus::Pending;
            m.kyc.submission = Some(submission.clone());
            m.kyc.submitted_at = Some(Utc::now());
            m.kyc.rejection_reason = None;
            Ok(m.clone())
        })
    }

    /// Review a pending submission. Face-match verification is stubbed: the
    /// reviewer's decision is taken as-is and the stub result is only logged.
    pub fn review_kyc(
        &self,
        user: UserId,
        reviewer: UserId,
        approved: bool,
        rejection_reason: Option<String>,
    ) -> CoreResult<Member> {
        tracing::info!(user_id = %user, "face verification stub: match assumed");
        let member = self.members.update(&user, |m| {
            if m.kyc.status != KycStatus::Pending {
                return Err(CoreError::conflict("KYC is not awaiting review"));
            }
            if approved {
                m.kyc.status = KycStatus::Verified;
                m.kyc.verified_at = Some(Utc::now());
            } else {
                m.kyc.status = KycStatus::Rejected;
                m.kyc.rejection_reason =
                    Some(rejection_reason.unwrap_or_else(|| "documents not conforming".into()));
            }
            m.kyc.reviewed_by = Some(reviewer);
            Ok(m.clone())
        })?;
        tracing::info!(
            user_id = %user,
            status = member.kyc.status.as_str(),
            "KYC reviewed"
        );
        Ok(member)
    }

    /// Grant or revoke the platform operator role.
    pub fn set_role(&self, user: UserId, role: UserRole) -> CoreResult<Member> {
        self.members.update(&user, |m| {
            m.role = role;
            Ok(m.clone())
        })
    }

    /// Members whose submission awaits review, oldest first.
    pub fn pending_kyc(&self) -> Vec<Member> {
        let mut pending = self.members.filter(|m| m.kyc.status == KycStatus::Pending);
        pending.sort_by_key(|m| m.kyc.submitted_at);
        pending
    }
}

impl Default for MemberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberDirectory for MemberRegistry {
    async fn get_member(&self, id: UserId) -> CoreResult<MemberProfile> {
        Ok(self.get(id)?.profile())
    }

    async fn record_payment_outcome(&self, id: UserId, outcome: PaymentOutcome) -> CoreResult<()> {
        let score = self.members.update(&id, |m| {
            m.reliability.record(outcome);
            Ok(m.reliability.score())
        })?;
        tracing::debug!(user_id = %id, ?outcome, score, "payment outcome recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_member() -> (MemberRegistry, UserId) {
        let registry = MemberRegistry::new();
        let member = registry
            .register("awa", "awa@example.com", "hash".into())
            .unwrap();
        (registry, member.id)
    }

    fn submission() -> KycSubmission {
        KycSubmission {
            national_id_number: "CI-001".into(),
            national_id_image: "/vault/id.png".into(),
            selfie_image: "/vault/selfie.png".into(),
        }
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let registry = MemberRegistry::new();
        let a = registry.register("a", "a@x.com", "h".into()).unwrap();
        let b = registry.register("b", "b@x.com", "h".into()).unwrap();
        assert_eq!(a.id, UserId(1));
        assert_eq!(b.id, UserId(2));
    }

    #[test]
    fn test_register_rejects_duplicate_email() {
        let (registry, _) = registry_with_member();
        let err = registry
            .register("other", "awa@example.com", "h".into())
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn test_kyc_submit_then_approve() {
        let (registry, id) = registry_with_member();
        let member = registry.submit_kyc(id, submission()).unwrap();
        assert_eq!(member.kyc.status, KycStatus::Pending);

        let member = registry.review_kyc(id, UserId(99), true, None).unwrap();
        assert_eq!(member.kyc.status, KycStatus::Verified);
        assert!(member.kyc_verified());
        assert_eq!(member.kyc.reviewed_by, Some(UserId(99)));
    }

    #[test]
    fn test_kyc_reject_keeps_reason_and_allows_resubmit() {
        let (registry, id) = registry_with_member();
        registry.submit_kyc(id, submission()).unwrap();
        let member = registry
            .review_kyc(id, UserId(99), false, Some("blurry scan".into()))
            .unwrap();
        assert_eq!(member.kyc.status, KycStatus::Rejected);
        assert_eq!(member.kyc.rejection_reason.as_deref(), Some("blurry scan"));

        // Rejected members may submit again.
        let member = registry.submit_kyc(id, submission()).unwrap();
        assert_eq!(member.kyc.status, KycStatus::Pending);
        assert!(member.kyc.rejection_reason.is_none());
    }

    #[test]
    fn test_review_requires_pending() {
        let (registry, id) = registry_with_member();
        let err = registry.review_kyc(id, UserId(99), true, None).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_directory_outcome_moves_score() {
        let (registry, id) = registry_with_member();
        registry
            .record_payment_outcome(id, PaymentOutcome::Late)
            .await
            .unwrap();
        let profile = registry.get_member(id).await.unwrap();
        assert_eq!(profile.reliability_score, 46);
    }

    #[tokio::test]
    async fn test_directory_unknown_member() {
        let registry = MemberRegistry::new();
        let err = registry.get_member(UserId(404)).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
