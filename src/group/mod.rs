//! Group Lifecycle Manager.
//!
//! Group creation, membership, and the pending -> active -> completed
//! transitions. Round succession itself lives in [`crate::round`].

pub mod service;
pub mod types;

pub use service::{CreateGroupRequest, GroupService, SettingsPatch};
pub use types::{
    ContributionSettings, Frequency, Group, GroupMember, GroupRules, GroupStatus, MemberRole,
    MembershipStatus,
};
