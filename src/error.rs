//! Core error taxonomy.
//!
//! Every failure path inside the engine surfaces as one of these kinds.
//! The gateway maps them to HTTP status codes; nothing is retried here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("KYC verification required: {0}")]
    Unverified(String),

    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl CoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn unverified(msg: impl Into<String>) -> Self {
        Self::Unverified(msg.into())
    }

    pub fn policy_violation(msg: impl Into<String>) -> Self {
        Self::PolicyViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Short machine-readable kind label, used in logs and API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound(_) => "not_found",
            CoreError::PermissionDenied(_) => "permission_denied",
            CoreError::Unverified(_) => "unverified",
            CoreError::PolicyViolation(_) => "policy_violation",
            CoreError::Conflict(_) => "conflict",
            CoreError::ValidationFailed(_) => "validation_failed",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(CoreError::not_found("group").kind(), "not_found");
        assert_eq!(CoreError::conflict("already paid").kind(), "conflict");
        assert_eq!(CoreError::validation("bad input").kind(), "validation_failed");
    }

    #[test]
    fn test_display_includes_context() {
        let err = CoreError::policy_violation("minimum reliability score is 40");
        assert_eq!(
            err.to_string(),
            "Policy violation: minimum reliability score is 40"
        );
    }
}
