//! Group lifecycle operations.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::core_types::{GroupId, UserId};
use crate::error::{CoreError, CoreResult};
use crate::notify::{NotificationKind, NotificationSink};
use crate::registry::MemberDirectory;
use crate::round::RoundEngine;
use crate::store::Store;

use super::types::{
    ContributionSettings, Group, GroupMember, GroupRules, GroupStatus, MemberRole,
    MembershipStatus,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub contribution_settings: ContributionSettings,
    #[serde(default)]
    pub rules: Option<GroupRules>,
}

/// Partial settings update; only present fields change.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SettingsPatch {
    pub description: Option<String>,
    pub contribution_settings: Option<ContributionSettings>,
    pub rules: Option<GroupRules>,
}

pub struct GroupService {
    groups: Arc<Store<GroupId, Group>>,
    directory: Arc<dyn MemberDirectory>,
    notifier: Arc<dyn NotificationSink>,
    engine: Arc<RoundEngine>,
}

impl GroupService {
    pub fn new(
        groups: Arc<Store<GroupId, Group>>,
        directory: Arc<dyn MemberDirectory>,
        notifier: Arc<dyn NotificationSink>,
        engine: Arc<RoundEngine>,
    ) -> Self {
        Self {
            groups,
            directory,
            notifier,
            engine,
        }
    }

    /// Create a group in pending status with the creator as sole admin.
    pub async fn create_group(
        &self,
        creator: UserId,
        req: CreateGroupRequest,
    ) -> CoreResult<Group> {
        let profile = self.directory.get_member(creator).await?;
        if !profile.kyc_verified {
            return Err(CoreError::permission_denied(
                "KYC verification is required to create a group",
            ));
        }

        if req.name.trim().is_empty() {
            return Err(CoreError::validation("group name must not be empty"));
        }
        let settings = req.contribution_settings;
        if settings.amount.is_zero() {
            return Err(CoreError::validation("contribution amount must be positive"));
        }
        if !(1..=28).contains(&settings.payment_deadline_day) {
            return Err(CoreError::validation(
                "payment deadline day must be between 1 and 28",
            ));
        }
        let rules = req.rules.unwrap_or_default();
        if rules.max_members < 2 {
            return Err(CoreError::validation("a group needs room for at least 2 members"));
        }
        if rules.min_reliability_score > 100 {
            return Err(CoreError::validation("reliability scores range from 0 to 100"));
        }

        let group = Group::new(
            creator,
            req.name.trim().to_string(),
            req.description,
            settings,
            rules,
        );
        self.groups.insert(group.id, group.clone())?;
        tracing::info!(group_id = %group.id, creator = %creator, name = %group.name, "group created");
        Ok(group)
    }

    /// Add a verified member. Admin-gated; score and capacity rules apply.
    pub async fn add_member(
        &self,
        group_id: GroupId,
        user: UserId,
        requester: UserId,
    ) -> CoreResult<Group> {
        let group = self.groups.require(&group_id)?;
        if !group.is_admin(requester) {
            return Err(CoreError::permission_denied(
                "only administrators can add members",
            ));
        }

        let profile = self.directory.get_member(user).await?;
        if !profile.kyc_verified {
            return Err(CoreError::unverified(
                "the member must complete KYC verification first",
            ));
        }

        // Group-local rules re-checked under the entry guard so two
        // concurrent adds cannot both squeeze past the capacity limit.
        let updated = self.groups.update(&group_id, |g| {
            if profile.reliability_score < g.rules.min_reliability_score {
                return Err(CoreError::policy_violation(format!(
                    "minimum reliability score is {}",
                    g.rules.min_reliability_score
                )));
            }
            if g.active_member_count() >= g.rules.max_members {
                return Err(CoreError::policy_violation(
                    "the group has reached its maximum member count",
                ));
            }
            if g.is_active_member(user) {
                return Err(CoreError::conflict("user is already a member of the group"));
            }
            match g.members.iter_mut().find(|m| m.user_id == user) {
                // Re-joining after having left: reactivate the entry.
                Some(entry) => {
                    entry.status = MembershipStatus::Active;
                    entry.role = MemberRole::Member;
                    entry.joined_at = Utc::now();
                }
                None => g.members.push(GroupMember {
                    user_id: user,
                    role: MemberRole::Member,
                    status: MembershipStatus::Active,
                    joined_at: Utc::now(),
                }),
            }
            Ok(g.clone())
        })?;

        self.notifier
            .notify(user, NotificationKind::MemberJoined { group: group_id, user })
            .await;
        tracing::info!(group_id = %group_id, user_id = %user, "member added");
        Ok(updated)
    }

    /// Soft-remove a member. The requester must be an admin or the member
    /// themself; the creator can never be removed.
    pub async fn remove_member(
        &self,
        group_id: GroupId,
        user: UserId,
        requester: UserId,
    ) -> CoreResult<Group> {
        let group = self.groups.require(&group_id)?;
        if !group.is_admin(requester) && requester != user {
            return Err(CoreError::permission_denied("not authorized to remove this member"));
        }
        if group.creator == user {
            return Err(CoreError::permission_denied("the creator cannot leave the group"));
        }

        let updated = self.groups.update(&group_id, |g| {
            let entry = g
                .members
                .iter_mut()
                .find(|m| m.user_id == user)
                .ok_or_else(|| CoreError::not_found("member in group"))?;
            if entry.status == MembershipStatus::Left {
                return Err(CoreError::conflict("member has already left the group"));
            }
            entry.status = MembershipStatus::Left;
            Ok(g.clone())
        })?;

        self.notifier
            .notify(user, NotificationKind::MemberRemoved { group: group_id, user })
            .await;
        tracing::info!(group_id = %group_id, user_id = %user, "member left");
        Ok(updated)
    }

    /// Start the rotation: compute the beneficiary order and open round 1.
    ///
    /// Order is active members ascending by reliability score — the least
    /// reliable members are served first, rewarding improvement over the
    /// cycle. Ties keep membership order (stable sort).
    pub async fn start_group(&self, group_id: GroupId, admin: UserId) -> CoreResult<Group> {
        let group = self.groups.require(&group_id)?;
        if !group.is_admin(admin) {
            return Err(CoreError::permission_denied(
                "only administrators can start the group",
            ));
        }
        if group.status != GroupStatus::Pending {
            return Err(CoreError::conflict("group has already been started"));
        }
        if !group.can_start() {
            return Err(CoreError::conflict(
                "at least 2 active members are required to start",
            ));
        }

        let mut order = Vec::with_capacity(group.active_member_count() as usize);
        for m in group.active_members() {
            order.push(self.directory.get_member(m.user_id).await?);
        }
        order.sort_by_key(|p| p.reliability_score);

        let now = Utc::now();
        let span = group.contribution_settings.frequency.period() * order.len() as i32;
        let expected_end = now + span;
        self.groups.update(&group_id, |g| {
            if g.status != GroupStatus::Pending {
                return Err(CoreError::conflict("group has already been started"));
            }
            if !g.can_start() {
                return Err(CoreError::conflict(
                    "at least 2 active members are required to start",
                ));
            }
            g.status = GroupStatus::Active;
            g.start_date = Some(now);
            g.expected_end_date = Some(expected_end);
            Ok(())
        })?;

        self.engine.create_round(group_id, &order).await?;

        for p in &order {
            self.notifier
                .notify(
                    p.id,
                    NotificationKind::GroupStarted {
                        group: group_id,
                        group_name: group.name.clone(),
                        expected_end_date: expected_end,
                    },
                )
                .await;
        }
        tracing::info!(group_id = %group_id, members = order.len(), "group started");
        self.groups.require(&group_id)
    }

    /// Close the group. No-op if it is already completed.
    pub async fn end_group(&self, group_id: GroupId, admin: UserId) -> CoreResult<Group> {
        let group = self.groups.require(&group_id)?;
        if !group.is_admin(admin) {
            return Err(CoreError::permission_denied(
                "only administrators can end the group",
            ));
        }

        self.groups.update(&group_id, |g| {
            if g.status == GroupStatus::Completed {
                return Ok(g.clone());
            }
            g.status = GroupStatus::Completed;
            g.actual_end_date = Some(Utc::now());
            tracing::info!(group_id = %g.id, "group ended by admin");
            Ok(g.clone())
        })
    }

    pub async fn suspend_group(&self, group_id: GroupId, admin: UserId) -> CoreResult<Group> {
        self.switch_status(group_id, admin, GroupStatus::Active, GroupStatus::Suspended)
    }

    pub async fn resume_group(&self, group_id: GroupId, admin: UserId) -> CoreResult<Group> {
        self.switch_status(group_id, admin, GroupStatus::Suspended, GroupStatus::Active)
    }

    fn switch_status(
        &self,
        group_id: GroupId,
        admin: UserId,
        from: GroupStatus,
        to: GroupStatus,
    ) -> CoreResult<Group> {
        let group = self.groups.require(&group_id)?;
        if !group.is_admin(admin) {
            return Err(CoreError::permission_denied(
                "only administrators can change the group status",
            ));
        }
        self.groups.update(&group_id, |g| {
            if g.status != from {
                return Err(CoreError::conflict(format!(
                    "group is {}, not {}",
                    g.status.as_str(),
                    from.as_str()
                )));
            }
            g.status = to;
            tracing::info!(group_id = %g.id, status = to.as_str(), "group status changed");
            Ok(g.clone())
        })
    }

    /// Update settings while the group is still pending.
    pub async fn update_settings(
        &self,
        group_id: GroupId,
        admin: UserId,
        patch: SettingsPatch,
    ) -> CoreResult<Group> {
        let group = self.groups.require(&group_id)?;
        if !group.is_admin(admin) {
            return Err(CoreError::permission_denied(
                "only administrators can modify settings",
            ));
        }
        if let Some(settings) = &patch.contribution_settings {
            if settings.amount.is_zero() {
                return Err(CoreError::validation("contribution amount must be positive"));
            }
        }

        self.groups.update(&group_id, |g| {
            if g.status != GroupStatus::Pending {
                return Err(CoreError::conflict(
                    "settings can only change while the group is pending",
                ));
            }
            if let Some(description) = patch.description.clone() {
                g.description = description;
            }
            if let Some(settings) = patch.contribution_settings {
                g.contribution_settings = settings;
            }
            if let Some(rules) = patch.rules {
                g.rules = rules;
            }
            Ok(g.clone())
        })
    }

    /// Group details, visible to its members only.
    pub fn group_details(&self, group_id: GroupId, requester: UserId) -> CoreResult<Group> {
        let group = self.groups.require(&group_id)?;
        if group.member(requester).is_none() {
            return Err(CoreError::permission_denied("not a member of this group"));
        }
        Ok(group)
    }

    /// Groups where the user is an active member, newest first.
    pub fn user_groups(&self, user: UserId) -> Vec<Group> {
        let mut groups = self.groups.filter(|g| g.is_active_member(user));
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Amount;
    use crate::notify::TracingSink;
    use crate::registry::{KycSubmission, MemberRegistry};
    use crate::round::Round;
    use crate::{core_types::RoundId, group::Frequency};

    struct Harness {
        registry: Arc<MemberRegistry>,
        groups: Arc<Store<GroupId, Group>>,
        service: GroupService,
    }

    fn harness() -> Harness {
        let registry = Arc::new(MemberRegistry::new());
        let groups: Arc<Store<GroupId, Group>> = Arc::new(Store::new("group"));
        let rounds: Arc<Store<RoundId, Round>> = Arc::new(Store::new("round"));
        let notifier = Arc::new(TracingSink);
        let engine = Arc::new(RoundEngine::new(
            rounds,
            Arc::clone(&groups),
            registry.clone() as Arc<dyn MemberDirectory>,
            notifier.clone() as Arc<dyn NotificationSink>,
        ));
        let service = GroupService::new(
            Arc::clone(&groups),
            registry.clone() as Arc<dyn MemberDirectory>,
            notifier as Arc<dyn NotificationSink>,
            engine,
        );
        Harness {
            registry,
            groups,
            service,
        }
    }

    fn verified_member(h: &Harness, name: &str) -> UserId {
        let member = h
            .registry
            .register(name, &format!("{name}@example.com"), "hash".into())
            .unwrap();
        h.registry
            .submit_kyc(
                member.id,
                KycSubmission {
                    national_id_number: "id".into(),
                    national_id_image: "a".into(),
                    selfie_image: "b".into(),
                },
            )
            .unwrap();
        h.registry
            .review_kyc(member.id, UserId(0), true, None)
            .unwrap();
        member.id
    }

    fn unverified_member(h: &Harness, name: &str) -> UserId {
        h.registry
            .register(name, &format!("{name}@example.com"), "hash".into())
            .unwrap()
            .id
    }

    fn create_request() -> CreateGroupRequest {
        CreateGroupRequest {
            name: "cercle".into(),
            description: "test group".into(),
            contribution_settings: ContributionSettings {
                amount: Amount::from_minor(10_000),
                frequency: Frequency::Monthly,
                payment_deadline_day: 5,
            },
            rules: None,
        }
    }

    #[tokio::test]
    async fn test_create_group_requires_verified_kyc() {
        let h = harness();
        let creator = unverified_member(&h, "awa");
        let err = h
            .service
            .create_group(creator, create_request())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_create_group_pending_with_creator_admin() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();
        assert_eq!(group.status, GroupStatus::Pending);
        assert!(group.is_admin(creator));
        assert_eq!(group.active_member_count(), 1);
    }

    #[tokio::test]
    async fn test_add_member_gates() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();

        // Non-admin requester
        let other = verified_member(&h, "bintou");
        let err = h
            .service
            .add_member(group.id, other, other)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));

        // Unverified target
        let raw = unverified_member(&h, "moussa");
        let err = h.service.add_member(group.id, raw, creator).await.unwrap_err();
        assert!(matches!(err, CoreError::Unverified(_)));

        // Happy path, then duplicate
        h.service.add_member(group.id, other, creator).await.unwrap();
        let err = h
            .service
            .add_member(group.id, other, creator)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_add_member_score_policy() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let mut req = create_request();
        req.rules = Some(GroupRules {
            min_reliability_score: 60,
            max_members: 10,
        });
        let group = h.service.create_group(creator, req).await.unwrap();

        // Fresh members score 50 < 60.
        let target = verified_member(&h, "bintou");
        let err = h
            .service
            .add_member(group.id, target, creator)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PolicyViolation(_)));
    }

    #[tokio::test]
    async fn test_add_member_capacity_policy() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let mut req = create_request();
        req.rules = Some(GroupRules {
            min_reliability_score: 0,
            max_members: 2,
        });
        let group = h.service.create_group(creator, req).await.unwrap();

        let second = verified_member(&h, "bintou");
        h.service.add_member(group.id, second, creator).await.unwrap();

        let third = verified_member(&h, "moussa");
        let err = h
            .service
            .add_member(group.id, third, creator)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PolicyViolation(_)));
    }

    #[tokio::test]
    async fn test_remove_member_rules() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();
        let member = verified_member(&h, "bintou");
        h.service.add_member(group.id, member, creator).await.unwrap();

        // Creator cannot be removed, even by themself.
        let err = h
            .service
            .remove_member(group.id, creator, creator)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));

        // A member may leave on their own.
        let updated = h
            .service
            .remove_member(group.id, member, member)
            .await
            .unwrap();
        assert!(!updated.is_active_member(member));
        assert!(updated.member(member).is_some());

        // Leaving twice conflicts.
        let err = h
            .service
            .remove_member(group.id, member, member)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_start_group_preconditions() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();

        // Too few members.
        let err = h.service.start_group(group.id, creator).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        let second = verified_member(&h, "bintou");
        h.service.add_member(group.id, second, creator).await.unwrap();

        // Non-admin cannot start.
        let err = h.service.start_group(group.id, second).await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));

        let started = h.service.start_group(group.id, creator).await.unwrap();
        assert_eq!(started.status, GroupStatus::Active);
        assert_eq!(started.total_rounds, 1);
        assert!(started.current_round.is_some());
        assert!(started.expected_end_date.is_some());

        // Starting twice conflicts.
        let err = h.service.start_group(group.id, creator).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_end_group_idempotent() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();

        let ended = h.service.end_group(group.id, creator).await.unwrap();
        assert_eq!(ended.status, GroupStatus::Completed);
        assert!(ended.actual_end_date.is_some());

        // Second call is a no-op, not an error.
        let again = h.service.end_group(group.id, creator).await.unwrap();
        assert_eq!(again.status, GroupStatus::Completed);
        assert_eq!(again.actual_end_date, ended.actual_end_date);
    }

    #[tokio::test]
    async fn test_settings_frozen_once_started() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();
        let second = verified_member(&h, "bintou");
        h.service.add_member(group.id, second, creator).await.unwrap();
        h.service.start_group(group.id, creator).await.unwrap();

        let err = h
            .service
            .update_settings(
                group.id,
                creator,
                SettingsPatch {
                    description: Some("new".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_suspend_resume_branch() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();
        let second = verified_member(&h, "bintou");
        h.service.add_member(group.id, second, creator).await.unwrap();
        h.service.start_group(group.id, creator).await.unwrap();

        let suspended = h.service.suspend_group(group.id, creator).await.unwrap();
        assert_eq!(suspended.status, GroupStatus::Suspended);
        let resumed = h.service.resume_group(group.id, creator).await.unwrap();
        assert_eq!(resumed.status, GroupStatus::Active);

        // Cannot suspend a pending group.
        let other = h.service.create_group(creator, create_request()).await.unwrap();
        let err = h.service.suspend_group(other.id, creator).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_group_details_visibility() {
        let h = harness();
        let creator = verified_member(&h, "awa");
        let group = h.service.create_group(creator, create_request()).await.unwrap();

        let stranger = verified_member(&h, "bintou");
        let err = h.service.group_details(group.id, stranger).unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied(_)));
        assert!(h.service.group_details(group.id, creator).is_ok());
        assert_eq!(h.service.user_groups(creator).len(), 1);
        // groups store holds the single record
        assert_eq!(h.groups.len(), 1);
    }
}
