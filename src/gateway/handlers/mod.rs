//! Request handlers, one module per resource.

pub mod groups;
pub mod health;
pub mod members;
pub mod rounds;
pub mod transactions;

pub use groups::*;
pub use health::*;
pub use members::*;
pub use rounds::*;
pub use transactions::*;

use crate::core_types::{GroupId, UserId};
use crate::error::CoreError;
use crate::group::Group;
use crate::money::{self, Amount};
use crate::registry::UserRole;

use super::state::AppState;
use super::types::ApiError;

/// Membership-gated group fetch where the caller must also be a group admin.
pub(crate) fn group_admin_gate(
    state: &AppState,
    group_id: GroupId,
    user: UserId,
) -> Result<Group, ApiError> {
    let group = state.groups.group_details(group_id, user)?;
    if !group.is_admin(user) {
        return Err(CoreError::permission_denied("group administrator required").into());
    }
    Ok(group)
}

/// Platform operator gate (KYC review and similar back-office actions).
pub(crate) fn staff_gate(state: &AppState, user: UserId) -> Result<(), ApiError> {
    let member = state.registry.get(user)?;
    if member.role != UserRole::Admin {
        return Err(CoreError::permission_denied("operator role required").into());
    }
    Ok(())
}

/// Parse a client decimal amount string into minor units.
pub(crate) fn parse_money(s: &str) -> Result<Amount, ApiError> {
    money::parse_amount(s).map_err(|e| ApiError::bad_request(format!("amount: {e}")))
}
